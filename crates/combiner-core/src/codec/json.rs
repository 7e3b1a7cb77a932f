use super::{WireFormat, CONFLICTING_ARRAY, CONFLICTING_PAYLOAD, MISSING_ARRAY, MISSING_PAYLOAD};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use combiner_common::types::{ArrayEncoding, DefaultData, Message, Metadata, NdArray};
use serde_json::{Map, Number, Value};

const PAYLOAD_KEYS: [&str; 3] = ["data", "binData", "strData"];

/// Largest magnitude below which every integral `f64` is exactly an `i64`.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// JSON wire format of the HTTP transport.
///
/// `data.ndarray` is a nested list, `data.tensor` is `{shape, values}` and
/// `strData` is plain text. `binData` is an opaque string: its text is the
/// payload and is written back verbatim, whatever encoding the caller chose.
pub struct JsonCodec;

impl WireFormat for JsonCodec {
    type Raw = Value;

    fn check(raw: &Value) -> Result<(), String> {
        let obj = raw
            .as_object()
            .ok_or_else(|| "SeldonMessage must be a JSON object".to_string())?;
        match PAYLOAD_KEYS.iter().filter(|key| obj.contains_key(**key)).count() {
            0 => Err(MISSING_PAYLOAD.to_string()),
            1 => Ok(()),
            _ => Err(CONFLICTING_PAYLOAD.to_string()),
        }
    }

    fn decode(raw: &Value) -> Result<Message, String> {
        Self::check(raw)?;
        if let Some(data) = raw.get("data") {
            return decode_default_data(data).map(Message::Data);
        }
        if let Some(bin) = raw.get("binData") {
            return bin
                .as_str()
                .map(|text| Message::BinData(text.as_bytes().to_vec()))
                .ok_or_else(|| "binData must be a string".to_string());
        }
        match raw.get("strData") {
            Some(Value::String(text)) => Ok(Message::StrData(text.clone())),
            _ => Err("strData must be a string".to_string()),
        }
    }

    fn encode(message: &Message, meta: Option<&Metadata>) -> Result<Value, String> {
        let mut out = Map::new();
        match message {
            Message::Data(data) => {
                out.insert("data".to_string(), encode_default_data(data));
            }
            Message::BinData(bytes) => {
                out.insert("binData".to_string(), Value::String(bin_data_text(bytes)));
            }
            Message::StrData(text) => {
                out.insert("strData".to_string(), Value::String(text.clone()));
            }
        }
        if let Some(meta) = meta {
            out.insert("meta".to_string(), encode_meta(meta));
        }
        Ok(Value::Object(out))
    }
}

/// Text of a `binData` field. Bytes that are not UTF-8 never came from this
/// transport and are written as standard base64.
fn bin_data_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

fn decode_default_data(data: &Value) -> Result<DefaultData, String> {
    let obj = data
        .as_object()
        .ok_or_else(|| "Default Data must be a JSON object".to_string())?;

    let names = match obj.get("names") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|name| {
                name.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "names must be a list of strings".to_string())
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err("names must be a list of strings".to_string()),
    };

    let (array, encoding) = match (obj.get("ndarray"), obj.get("tensor")) {
        (Some(ndarray), None) => (parse_ndarray(ndarray)?, ArrayEncoding::Ndarray),
        (None, Some(tensor)) => (parse_tensor(tensor)?, ArrayEncoding::Tensor),
        (None, None) => return Err(MISSING_ARRAY.to_string()),
        (Some(_), Some(_)) => return Err(CONFLICTING_ARRAY.to_string()),
    };

    Ok(DefaultData {
        names,
        array,
        encoding,
    })
}

/// Parse nested numeric lists; the shape is taken from the first element at
/// each depth and every sibling must match it.
pub fn parse_ndarray(value: &Value) -> Result<NdArray, String> {
    if !value.is_array() {
        return Err("ndarray must be a list".to_string());
    }
    let mut shape = Vec::new();
    let mut cursor = value;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }
    // Grown only by leaves actually present; the inferred shape is not trusted yet.
    let mut values = Vec::new();
    flatten(value, &shape, &mut values)?;
    NdArray::new(shape, values)
}

fn flatten(value: &Value, shape: &[usize], out: &mut Vec<f64>) -> Result<(), String> {
    match (shape.split_first(), value) {
        (None, Value::Number(n)) => {
            let v = n
                .as_f64()
                .ok_or_else(|| format!("ndarray value {n} is not representable as f64"))?;
            out.push(v);
            Ok(())
        }
        (None, Value::Array(_)) => Err("ndarray is ragged".to_string()),
        (None, other) => Err(format!("ndarray holds a non-numeric value: {other}")),
        (Some((&len, rest)), Value::Array(items)) if items.len() == len => {
            items.iter().try_for_each(|item| flatten(item, rest, out))
        }
        (Some(_), _) => Err("ndarray is ragged".to_string()),
    }
}

fn parse_tensor(value: &Value) -> Result<NdArray, String> {
    let shape = value
        .get("shape")
        .and_then(Value::as_array)
        .ok_or_else(|| "tensor must contain a shape list".to_string())?
        .iter()
        .map(|dim| {
            dim.as_u64()
                .and_then(|d| usize::try_from(d).ok())
                .ok_or_else(|| format!("tensor shape entry {dim} is not a non-negative integer"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let values = value
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| "tensor must contain a values list".to_string())?
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| format!("tensor holds a non-numeric value: {v}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    NdArray::new(shape, values).map_err(|e| format!("tensor {e}"))
}

/// Nested-list rendering of `array`.
pub fn to_nested(array: &NdArray) -> Value {
    nest(array.shape(), array.values())
}

fn nest(shape: &[usize], values: &[f64]) -> Value {
    match shape.split_first() {
        None => number(values.first().copied().unwrap_or_default()),
        Some((&len, rest)) => {
            let stride: usize = rest.iter().product();
            Value::Array(
                (0..len)
                    .map(|i| nest(rest, &values[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

/// Integral values are written as JSON integers; non-finite values as null.
/// Negative zero stays a float so its sign survives.
pub(crate) fn number(value: f64) -> Value {
    if value == 0.0 && value.is_sign_negative() {
        return Number::from_f64(value).map_or(Value::Null, Value::Number);
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

fn encode_default_data(data: &DefaultData) -> Value {
    let mut out = Map::new();
    out.insert(
        "names".to_string(),
        Value::Array(data.names.iter().cloned().map(Value::String).collect()),
    );
    match data.encoding {
        ArrayEncoding::Ndarray => {
            out.insert("ndarray".to_string(), to_nested(&data.array));
        }
        ArrayEncoding::Tensor => {
            let mut tensor = Map::new();
            tensor.insert(
                "shape".to_string(),
                Value::Array(data.array.shape().iter().map(|&d| Value::from(d)).collect()),
            );
            tensor.insert(
                "values".to_string(),
                Value::Array(data.array.values().iter().map(|&v| number(v)).collect()),
            );
            out.insert("tensor".to_string(), Value::Object(tensor));
        }
    }
    Value::Object(out)
}

fn encode_meta(meta: &Metadata) -> Value {
    let metrics = meta
        .metrics
        .iter()
        .map(|m| {
            let mut entry = Map::new();
            entry.insert("type".to_string(), Value::String(m.kind.to_string()));
            entry.insert("key".to_string(), Value::String(m.key.clone()));
            entry.insert("value".to_string(), number(m.value));
            Value::Object(entry)
        })
        .collect();
    let mut out = Map::new();
    out.insert("tags".to_string(), Value::Object(meta.tags.clone()));
    out.insert("metrics".to_string(), Value::Array(metrics));
    Value::Object(out)
}
