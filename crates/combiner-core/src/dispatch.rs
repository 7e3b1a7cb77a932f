//! Selection and invocation of the aggregation contract.

use crate::error::{CombinerError, Result};
use crate::model::{Aggregate, AggregateInput, Aggregated, LowLevelAggregate};
use combiner_common::types::Message;
use std::sync::Arc;

/// The aggregation contract one transport uses, fixed at startup.
pub enum Contract<M> {
    /// Transport-native messages in, transport-native message out.
    LowLevel(Arc<dyn LowLevelAggregate<M>>),
    /// Decoded inputs in, [`Aggregated`] out.
    HighLevel(Arc<dyn Aggregate>),
}

impl<M> Contract<M> {
    /// Prefer the low-level capability, fall back to the high-level one.
    pub fn resolve(
        transport: &str,
        low_level: Option<Arc<dyn LowLevelAggregate<M>>>,
        high_level: Option<Arc<dyn Aggregate>>,
    ) -> Result<Self> {
        match (low_level, high_level) {
            (Some(raw), _) => Ok(Contract::LowLevel(raw)),
            (None, Some(decoded)) => Ok(Contract::HighLevel(decoded)),
            (None, None) => Err(CombinerError::Configuration(format!(
                "collaborator exposes neither a {transport} low-level aggregate nor a high-level aggregate"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Contract::LowLevel(_) => "low-level",
            Contract::HighLevel(_) => "high-level",
        }
    }
}

/// Call the low-level collaborator; its output is returned untouched.
pub fn invoke_low_level<M>(aggregator: &dyn LowLevelAggregate<M>, messages: &[M]) -> Result<M> {
    aggregator
        .aggregate_raw(messages)
        .map_err(CombinerError::aggregation)
}

/// Call the high-level collaborator with one input and one feature-name list
/// per message.
pub fn invoke_high_level(aggregator: &dyn Aggregate, messages: &[Message]) -> Result<Aggregated> {
    let inputs: Vec<AggregateInput<'_>> = messages.iter().map(AggregateInput::from).collect();
    let feature_names: Vec<&[String]> = messages.iter().map(Message::feature_names).collect();
    aggregator
        .aggregate(&inputs, &feature_names)
        .map_err(CombinerError::aggregation)
}
