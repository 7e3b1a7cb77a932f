//! Conversion between wire-level messages and the canonical [`Message`].
//!
//! Each transport implements [`WireFormat`]. For every message `m` that
//! `decode` can produce, `decode(&encode(&m, None)?) == m`.

pub mod json;
pub mod proto;

use combiner_common::types::{Message, Metadata};

pub use json::JsonCodec;
pub use proto::ProtoCodec;

/// Payload-variant problems shared by both wire formats.
pub(crate) const MISSING_PAYLOAD: &str =
    "Request must contain Default Data or binData or strData";
pub(crate) const CONFLICTING_PAYLOAD: &str =
    "Request must contain only one of Default Data or binData or strData";
pub(crate) const MISSING_ARRAY: &str = "Default Data must contain ndarray or tensor";
pub(crate) const CONFLICTING_ARRAY: &str = "Default Data must contain only one of ndarray or tensor";

pub trait WireFormat {
    /// Transport-native representation of a single message.
    type Raw;

    /// Structural check: exactly one payload variant, nothing decoded.
    fn check(raw: &Self::Raw) -> Result<(), String>;

    fn decode(raw: &Self::Raw) -> Result<Message, String>;

    /// Fails only when the message cannot be represented on this transport.
    fn encode(message: &Message, meta: Option<&Metadata>) -> Result<Self::Raw, String>;
}
