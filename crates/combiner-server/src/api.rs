use crate::logging::TraceId;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use combiner_core::CombinerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Failure details, mirroring the protobuf `Status` message.
#[derive(Serialize, ToSchema)]
pub struct FailureStatus {
    /// Always -1.
    pub code: i32,
    /// Human-readable detail.
    pub info: String,
    /// Machine-readable reason, e.g. `MICROSERVICE_BAD_DATA`.
    pub reason: String,
    /// Always `FAILURE`.
    pub status: String,
}

/// Body of every non-200 response.
#[derive(Serialize, ToSchema)]
pub struct FailureEnvelope {
    pub status: FailureStatus,
}

/// Request envelope. Each message holds exactly one of `data`, `binData` or `strData`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AggregateEnvelope {
    #[serde(rename = "seldonMessages")]
    #[schema(value_type = Vec<Object>)]
    pub seldon_messages: Vec<Value>,
}

/// Combined message: one of `data`, `binData` or `strData`, plus `meta`
/// when a high-level aggregate produced it.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CombinedMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(rename = "binData", skip_serializing_if = "Option::is_none")]
    pub bin_data: Option<String>,
    #[serde(rename = "strData", skip_serializing_if = "Option::is_none")]
    pub str_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub meta: Option<Value>,
}

#[derive(Deserialize, IntoParams)]
pub struct AggregateQuery {
    /// URL-encoded JSON envelope `{"seldonMessages": [...]}`.
    pub json: Option<String>,
}

pub fn failure_response(err: &CombinerError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(FailureEnvelope {
            status: FailureStatus {
                code: -1,
                info: err.to_string(),
                reason: err.reason().to_string(),
                status: "FAILURE".to_string(),
            },
        }),
    )
        .into_response()
}

fn parse_envelope(raw: &[u8]) -> Result<Value, CombinerError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(CombinerError::BadRequestShape(
            "Empty json parameter in data".to_string(),
        ));
    }
    serde_json::from_slice(raw)
        .map_err(|e| CombinerError::BadRequestShape(format!("Invalid JSON in request: {e}")))
}

async fn combine(state: &AppState, trace_id: &str, envelope: Result<Value, CombinerError>) -> Response {
    let result = match envelope {
        Ok(envelope) => state.combine(move |c| c.aggregate_json(&envelope)).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(combined) => (StatusCode::OK, Json(combined)).into_response(),
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, reason = e.reason(), error = %e, "Aggregation rejected");
            failure_response(&e)
        }
    }
}

/// Combine the messages of an envelope passed as the `json` query parameter.
#[utoipa::path(
    get,
    path = "/aggregate",
    tag = "Combiner",
    params(AggregateQuery),
    responses(
        (status = 200, description = "Combined message", body = CombinedMessage),
        (status = 400, description = "Malformed envelope, message or metric", body = FailureEnvelope),
        (status = 500, description = "Aggregation failed", body = FailureEnvelope)
    )
)]
async fn aggregate_get(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<AggregateQuery>,
) -> Response {
    let envelope = parse_envelope(query.json.as_deref().unwrap_or_default().as_bytes());
    combine(&state, &trace_id, envelope).await
}

/// Combine the messages of a JSON envelope sent as the request body, or as
/// the `json` query parameter when present.
#[utoipa::path(
    post,
    path = "/aggregate",
    tag = "Combiner",
    params(AggregateQuery),
    request_body = AggregateEnvelope,
    responses(
        (status = 200, description = "Combined message", body = CombinedMessage),
        (status = 400, description = "Malformed envelope, message or metric", body = FailureEnvelope),
        (status = 500, description = "Aggregation failed", body = FailureEnvelope)
    )
)]
async fn aggregate_post(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<AggregateQuery>,
    body: Bytes,
) -> Response {
    let envelope = match query.json.as_deref() {
        Some(json) => parse_envelope(json.as_bytes()),
        None => parse_envelope(&body),
    };
    combine(&state, &trace_id, envelope).await
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses((status = 200, description = "Service is alive", body = String))
)]
async fn ping() -> &'static str {
    "pong"
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    /// Name of the configured aggregator.
    pub aggregator: String,
    /// Contract used for HTTP requests (`low-level` or `high-level`).
    pub rest_contract: String,
    /// Contract used for gRPC requests.
    pub grpc_contract: String,
}

/// Service status and the resolved aggregation contracts.
#[utoipa::path(
    get,
    path = "/health/status",
    tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
async fn status(State(state): State<AppState>) -> Json<HealthResponse> {
    let (rest, grpc) = state.combiner.contracts();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        aggregator: state.combiner.name().to_string(),
        rest_contract: rest.to_string(),
        grpc_contract: grpc.to_string(),
    })
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(aggregate_get, aggregate_post))
        .routes(routes!(ping))
        .routes(routes!(status))
}
