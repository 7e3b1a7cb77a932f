use crate::state::AppState;
use combiner_common::proto::combiner_server::Combiner as CombinerService;
use combiner_common::proto::{SeldonMessage, SeldonMessageList};
use combiner_core::CombinerError;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Request, Response, Status};

/// Metadata key carrying the machine-readable failure reason.
pub const REASON_METADATA_KEY: &str = "x-seldon-reason";

pub struct CombinerServiceImpl {
    state: AppState,
}

impl CombinerServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

/// Map a pipeline failure onto a gRPC status: `info` as the message, the
/// reason code in [`REASON_METADATA_KEY`].
pub fn to_status(err: &CombinerError) -> Status {
    let code = if err.is_client_error() {
        Code::InvalidArgument
    } else {
        Code::Internal
    };
    let mut metadata = MetadataMap::new();
    metadata.insert(REASON_METADATA_KEY, MetadataValue::from_static(err.reason()));
    Status::with_metadata(code, err.to_string(), metadata)
}

#[tonic::async_trait]
impl CombinerService for CombinerServiceImpl {
    async fn aggregate(
        &self,
        request: Request<SeldonMessageList>,
    ) -> Result<Response<SeldonMessage>, Status> {
        let list = request.into_inner();
        let count = list.seldon_messages.len();
        tracing::debug!(count, "gRPC aggregate request");

        match self.state.combine(move |c| c.aggregate_proto(&list)).await {
            Ok(combined) => Ok(Response::new(combined)),
            Err(e) => {
                tracing::warn!(count, reason = e.reason(), error = %e, "gRPC aggregate rejected");
                Err(to_status(&e))
            }
        }
    }
}
