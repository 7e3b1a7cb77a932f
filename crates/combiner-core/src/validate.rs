//! Structural checks on an incoming request, run before anything is decoded.

use crate::codec::WireFormat;
use crate::error::{CombinerError, Result};
use serde_json::Value;

/// Envelope field holding the messages to combine.
pub const SELDON_MESSAGES: &str = "seldonMessages";

/// Extract the message list from a JSON envelope.
///
/// # Examples
///
/// ```
/// use combiner_core::validate::seldon_messages;
/// use serde_json::json;
///
/// let envelope = json!({"seldonMessages": [{"strData": "a"}]});
/// assert_eq!(seldon_messages(&envelope).unwrap().len(), 1);
///
/// let err = seldon_messages(&json!({"seldonMessages": []})).unwrap_err();
/// assert_eq!(err.to_string(), "seldonMessages field is empty");
/// ```
pub fn seldon_messages(envelope: &Value) -> Result<&[Value]> {
    let field = envelope.get(SELDON_MESSAGES).ok_or_else(|| {
        CombinerError::BadRequestShape("Request must contain seldonMessages field".to_string())
    })?;
    let messages = field.as_array().ok_or_else(|| {
        CombinerError::BadRequestShape("seldonMessages field is not a list".to_string())
    })?;
    ensure_non_empty(messages)?;
    Ok(messages)
}

/// Check every message carries exactly one payload, stopping at the first
/// offender.
pub fn check_messages<W: WireFormat>(messages: &[W::Raw]) -> Result<()> {
    ensure_non_empty(messages)?;
    for (index, raw) in messages.iter().enumerate() {
        W::check(raw).map_err(|detail| CombinerError::InvalidMessage { index, detail })?;
    }
    Ok(())
}

fn ensure_non_empty<T>(messages: &[T]) -> Result<()> {
    if messages.is_empty() {
        return Err(CombinerError::BadRequestShape(
            "seldonMessages field is empty".to_string(),
        ));
    }
    Ok(())
}
