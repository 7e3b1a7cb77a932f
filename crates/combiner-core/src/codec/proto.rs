use super::json::{self, parse_ndarray};
use super::{WireFormat, MISSING_ARRAY, MISSING_PAYLOAD};
use combiner_common::proto::{self, default_data, metric, seldon_message};
use combiner_common::types::{ArrayEncoding, DefaultData, Message, Metadata, MetricKind, NdArray};
use prost_types::value::Kind;
use prost_types::{ListValue, Struct};

/// Protobuf wire format of the gRPC transport.
pub struct ProtoCodec;

impl WireFormat for ProtoCodec {
    type Raw = proto::SeldonMessage;

    fn check(raw: &proto::SeldonMessage) -> Result<(), String> {
        match raw.data_oneof {
            Some(_) => Ok(()),
            None => Err(MISSING_PAYLOAD.to_string()),
        }
    }

    fn decode(raw: &proto::SeldonMessage) -> Result<Message, String> {
        match &raw.data_oneof {
            Some(seldon_message::DataOneof::Data(data)) => decode_default_data(data).map(Message::Data),
            Some(seldon_message::DataOneof::BinData(bytes)) => Ok(Message::BinData(bytes.clone())),
            Some(seldon_message::DataOneof::StrData(text)) => Ok(Message::StrData(text.clone())),
            None => Err(MISSING_PAYLOAD.to_string()),
        }
    }

    fn encode(
        message: &Message,
        meta: Option<&Metadata>,
    ) -> Result<proto::SeldonMessage, String> {
        let data_oneof = match message {
            Message::Data(data) => seldon_message::DataOneof::Data(encode_default_data(data)?),
            Message::BinData(bytes) => seldon_message::DataOneof::BinData(bytes.clone()),
            Message::StrData(text) => seldon_message::DataOneof::StrData(text.clone()),
        };
        Ok(proto::SeldonMessage {
            status: None,
            meta: meta.map(encode_meta),
            data_oneof: Some(data_oneof),
        })
    }
}

fn decode_default_data(data: &proto::DefaultData) -> Result<DefaultData, String> {
    let (array, encoding) = match &data.data_oneof {
        Some(default_data::DataOneof::Tensor(tensor)) => {
            let shape = tensor
                .shape
                .iter()
                .map(|&d| {
                    usize::try_from(d).map_err(|_| format!("tensor shape entry {d} is negative"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let array = NdArray::new(shape, tensor.values.clone()).map_err(|e| format!("tensor {e}"))?;
            (array, ArrayEncoding::Tensor)
        }
        Some(default_data::DataOneof::Ndarray(list)) => {
            (parse_ndarray(&list_to_json(list))?, ArrayEncoding::Ndarray)
        }
        None => return Err(MISSING_ARRAY.to_string()),
    };
    Ok(DefaultData {
        names: data.names.clone(),
        array,
        encoding,
    })
}

fn encode_default_data(data: &DefaultData) -> Result<proto::DefaultData, String> {
    let tensor = || -> Result<default_data::DataOneof, String> {
        let shape = data
            .array
            .shape()
            .iter()
            .map(|&d| {
                i32::try_from(d).map_err(|_| format!("tensor shape entry {d} does not fit in int32"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(default_data::DataOneof::Tensor(proto::Tensor {
            shape,
            values: data.array.values().to_vec(),
        }))
    };
    let data_oneof = match data.encoding {
        ArrayEncoding::Tensor => tensor()?,
        ArrayEncoding::Ndarray => match json_to_value(&json::to_nested(&data.array)).kind {
            Some(Kind::ListValue(list)) => default_data::DataOneof::Ndarray(list),
            _ => tensor()?,
        },
    };
    Ok(proto::DefaultData {
        names: data.names.clone(),
        data_oneof: Some(data_oneof),
    })
}

fn encode_meta(meta: &Metadata) -> proto::Meta {
    proto::Meta {
        tags: meta
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect(),
        metrics: meta
            .metrics
            .iter()
            .map(|m| proto::Metric {
                key: m.key.clone(),
                r#type: metric_type(m.kind) as i32,
                value: m.value as f32,
            })
            .collect(),
        ..Default::default()
    }
}

fn metric_type(kind: MetricKind) -> metric::MetricType {
    match kind {
        MetricKind::Counter => metric::MetricType::Counter,
        MetricKind::Gauge => metric::MetricType::Gauge,
        MetricKind::Timer => metric::MetricType::Timer,
    }
}

/// Convert a JSON value into a `google.protobuf.Value`.
pub fn json_to_value(value: &serde_json::Value) -> prost_types::Value {
    let kind = match value {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        serde_json::Value::Number(n) => n.as_f64().map_or(Kind::NullValue(0), Kind::NumberValue),
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(obj) => Kind::StructValue(Struct {
            fields: obj
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Convert a `google.protobuf.Value` into JSON. Integral numbers become JSON integers.
pub fn value_to_json(value: &prost_types::Value) -> serde_json::Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::NumberValue(n)) => json::number(*n),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::ListValue(list)) => list_to_json(list),
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

fn list_to_json(list: &ListValue) -> serde_json::Value {
    serde_json::Value::Array(list.values.iter().map(value_to_json).collect())
}
