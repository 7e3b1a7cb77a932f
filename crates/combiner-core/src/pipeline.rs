use crate::assemble::{assemble_message, assemble_metadata};
use crate::codec::{JsonCodec, ProtoCodec, WireFormat};
use crate::dispatch::{invoke_high_level, invoke_low_level, Contract};
use crate::error::{CombinerError, Result};
use crate::model::{MetadataSource, UserModel};
use crate::validate;
use combiner_common::proto;
use combiner_common::types::Message;
use serde_json::Value;
use std::sync::Arc;

/// The request pipeline shared by both transports.
///
/// Built once at startup from a [`UserModel`] and shared behind an `Arc`; it
/// holds no per-request state.
pub struct Combiner {
    name: String,
    rest: Contract<Value>,
    grpc: Contract<proto::SeldonMessage>,
    metadata: Arc<dyn MetadataSource>,
}

impl Combiner {
    /// Resolve the contract for each transport. Fails when a transport has
    /// neither a low-level nor a high-level aggregate to call.
    pub fn new(model: UserModel) -> Result<Self> {
        let UserModel {
            name,
            metadata,
            high_level,
            rest,
            grpc,
        } = model;
        let rest = Contract::resolve("REST", rest, high_level.clone())?;
        let grpc = Contract::resolve("gRPC", grpc, high_level)?;
        tracing::debug!(
            model = %name,
            rest = rest.name(),
            grpc = grpc.name(),
            "Aggregation contracts resolved"
        );
        Ok(Self {
            name,
            rest,
            grpc,
            metadata,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contract names as `(rest, grpc)`.
    pub fn contracts(&self) -> (&'static str, &'static str) {
        (self.rest.name(), self.grpc.name())
    }

    /// Combine the messages of a JSON envelope `{"seldonMessages": [...]}`.
    pub fn aggregate_json(&self, envelope: &Value) -> Result<Value> {
        let messages = validate::seldon_messages(envelope)?;
        self.run::<JsonCodec>(&self.rest, messages)
    }

    /// Combine the messages of a protobuf message list.
    pub fn aggregate_proto(&self, list: &proto::SeldonMessageList) -> Result<proto::SeldonMessage> {
        self.run::<ProtoCodec>(&self.grpc, &list.seldon_messages)
    }

    fn run<W: WireFormat>(&self, contract: &Contract<W::Raw>, raws: &[W::Raw]) -> Result<W::Raw> {
        validate::check_messages::<W>(raws)?;
        match contract {
            Contract::LowLevel(aggregator) => invoke_low_level(aggregator.as_ref(), raws),
            Contract::HighLevel(aggregator) => {
                let messages = decode_all::<W>(raws)?;
                let aggregated = invoke_high_level(aggregator.as_ref(), &messages)?;
                let message = assemble_message(&messages, aggregated)?;
                // Metrics are only checked once the aggregate call has already run.
                let metadata = assemble_metadata(self.metadata.as_ref())?;
                W::encode(&message, Some(&metadata)).map_err(CombinerError::AggregationFailed)
            }
        }
    }
}

fn decode_all<W: WireFormat>(raws: &[W::Raw]) -> Result<Vec<Message>> {
    raws.iter()
        .enumerate()
        .map(|(index, raw)| {
            W::decode(raw).map_err(|detail| CombinerError::InvalidMessage { index, detail })
        })
        .collect()
}
