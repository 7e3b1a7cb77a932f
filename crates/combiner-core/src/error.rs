/// Reason code for malformed requests and messages.
pub const REASON_BAD_DATA: &str = "MICROSERVICE_BAD_DATA";
/// Reason code for collaborator metrics with an unrecognised kind.
pub const REASON_BAD_METRIC: &str = "MICROSERVICE_BAD_METRIC";
/// Reason code for failures raised by the aggregation collaborator itself.
pub const REASON_INTERNAL: &str = "MICROSERVICE_INTERNAL_ERROR";

/// Errors produced by the combiner pipeline.
///
/// The `Display` output of each variant is the human-readable `info` sent to
/// the caller; [`CombinerError::reason`] is the machine-readable code.
///
/// # Examples
///
/// ```rust
/// use combiner_core::CombinerError;
///
/// let err = CombinerError::InvalidMessage {
///     index: 2,
///     detail: "Request must contain Default Data or binData or strData".to_string(),
/// };
/// assert_eq!(err.reason(), "MICROSERVICE_BAD_DATA");
/// assert!(err.to_string().starts_with("Invalid SeldonMessage at index 2 : "));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CombinerError {
    /// The envelope lacks a usable `seldonMessages` list, or is not parseable at all.
    #[error("{0}")]
    BadRequestShape(String),

    /// The message at `index` has no payload, several payloads, or a payload that fails to decode.
    #[error("Invalid SeldonMessage at index {index} : {detail}")]
    InvalidMessage { index: usize, detail: String },

    /// A collaborator metric carries a kind outside COUNTER, GAUGE and TIMER.
    #[error("Bad metric created during request: {0}")]
    InvalidMetrics(String),

    /// The collaborator returned an error or an unusable result.
    #[error("Aggregation failed: {0}")]
    AggregationFailed(String),

    /// The collaborator cannot serve one of the transports. Startup only.
    #[error("Invalid combiner configuration: {0}")]
    Configuration(String),
}

impl CombinerError {
    pub fn reason(&self) -> &'static str {
        match self {
            CombinerError::BadRequestShape(_) | CombinerError::InvalidMessage { .. } => {
                REASON_BAD_DATA
            }
            CombinerError::InvalidMetrics(_) => REASON_BAD_METRIC,
            CombinerError::AggregationFailed(_) | CombinerError::Configuration(_) => {
                REASON_INTERNAL
            }
        }
    }

    /// Whether the caller is at fault (HTTP 4xx / gRPC `InvalidArgument`).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CombinerError::BadRequestShape(_)
                | CombinerError::InvalidMessage { .. }
                | CombinerError::InvalidMetrics(_)
        )
    }

    pub(crate) fn aggregation(err: anyhow::Error) -> Self {
        CombinerError::AggregationFailed(format!("{err:#}"))
    }
}

/// Convenience `Result` alias for pipeline operations.
pub type Result<T> = std::result::Result<T, CombinerError>;
