use crate::error::{CombinerError, Result};
use crate::metrics::validate_metrics;
use crate::model::{Aggregated, MetadataSource};
use combiner_common::types::{ArrayEncoding, DefaultData, Message, Metadata};

/// Build the canonical response message from a high-level result.
///
/// A selection passes the chosen input through unchanged. A computed array is
/// wrapped as default data in the wire form of the first numeric input, unless
/// the first input is binary or text, in which case that input is passed
/// through instead.
pub fn assemble_message(inputs: &[Message], aggregated: Aggregated) -> Result<Message> {
    match aggregated {
        Aggregated::Select(index) => inputs.get(index).cloned().ok_or_else(|| {
            CombinerError::AggregationFailed(format!(
                "collaborator selected message {index} but only {} were given",
                inputs.len()
            ))
        }),
        Aggregated::Array(array) => {
            if let Some(first @ (Message::BinData(_) | Message::StrData(_))) = inputs.first() {
                return Ok(first.clone());
            }
            let encoding = if array.shape().is_empty() {
                ArrayEncoding::Tensor
            } else {
                inputs
                    .iter()
                    .find_map(|m| match m {
                        Message::Data(data) => Some(data.encoding),
                        Message::BinData(_) | Message::StrData(_) => None,
                    })
                    .unwrap_or_default()
            };
            Ok(Message::Data(DefaultData {
                names: Vec::new(),
                array,
                encoding,
            }))
        }
    }
}

/// Collect tags verbatim and validated metrics from the collaborator.
pub fn assemble_metadata(source: &dyn MetadataSource) -> Result<Metadata> {
    let tags = source.tags();
    let metrics = validate_metrics(&source.metrics())?;
    Ok(Metadata { tags, metrics })
}
