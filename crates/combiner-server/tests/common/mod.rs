#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use combiner_common::proto::{self, default_data, seldon_message};
use combiner_common::types::{NdArray, ReportedMetric, Tags};
use combiner_core::model::{
    Aggregate, AggregateInput, Aggregated, LowLevelAggregate, MetadataSource, UserModel,
};
use combiner_core::Combiner;
use combiner_server::app;
use combiner_server::config::ServerConfig;
use combiner_server::state::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context(model: UserModel) -> Result<TestContext> {
    let combiner = Combiner::new(model)?;
    let state = AppState::new(combiner, ServerConfig::default());
    let app = app::build_http_app(state.clone());
    Ok(TestContext { state, app })
}

/// High-level collaborator: returns the first input, or a fixed `[1, 2, 3]`.
pub struct UserObject {
    pub metrics_ok: bool,
    pub ret_nparray: bool,
}

impl UserObject {
    pub fn model(metrics_ok: bool, ret_nparray: bool) -> UserModel {
        UserModel::from_aggregate(Arc::new(UserObject {
            metrics_ok,
            ret_nparray,
        }))
    }
}

impl Aggregate for UserObject {
    fn aggregate(
        &self,
        _inputs: &[AggregateInput<'_>],
        _feature_names: &[&[String]],
    ) -> anyhow::Result<Aggregated> {
        if self.ret_nparray {
            Ok(Aggregated::Array(NdArray::from_vec(vec![1.0, 2.0, 3.0])))
        } else {
            Ok(Aggregated::Select(0))
        }
    }
}

impl MetadataSource for UserObject {
    fn tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("mytag".to_string(), json!(1));
        tags
    }

    fn metrics(&self) -> Vec<ReportedMetric> {
        let kind = if self.metrics_ok { "COUNTER" } else { "BAD" };
        vec![ReportedMetric::new(kind, "mycounter", 1.0)]
    }
}

/// Low-level collaborator answering `[9, 9]` on both transports.
pub struct UserObjectLowLevel;

impl UserObjectLowLevel {
    pub fn model() -> UserModel {
        let object = Arc::new(UserObjectLowLevel);
        UserModel::new(object.clone())
            .with_rest(object.clone())
            .with_grpc(object)
    }
}

impl MetadataSource for UserObjectLowLevel {}

impl LowLevelAggregate<Value> for UserObjectLowLevel {
    fn aggregate_raw(&self, _messages: &[Value]) -> anyhow::Result<Value> {
        Ok(json!({"data": {"ndarray": [9, 9]}}))
    }
}

impl LowLevelAggregate<proto::SeldonMessage> for UserObjectLowLevel {
    fn aggregate_raw(&self, _messages: &[proto::SeldonMessage]) -> anyhow::Result<proto::SeldonMessage> {
        Ok(tensor_message(vec![2, 1], vec![9.0, 9.0]))
    }
}

/// High-level collaborator that always fails.
pub struct Exploding;

impl MetadataSource for Exploding {}

impl Aggregate for Exploding {
    fn aggregate(&self, _: &[AggregateInput<'_>], _: &[&[String]]) -> anyhow::Result<Aggregated> {
        anyhow::bail!("model exploded")
    }
}

pub fn tensor_message(shape: Vec<i32>, values: Vec<f64>) -> proto::SeldonMessage {
    proto::SeldonMessage {
        data_oneof: Some(seldon_message::DataOneof::Data(proto::DefaultData {
            names: vec![],
            data_oneof: Some(default_data::DataOneof::Tensor(proto::Tensor { shape, values })),
        })),
        ..Default::default()
    }
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, HeaderMap) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("router should respond");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body, headers)
}

/// `GET /aggregate?json=<envelope>`.
pub async fn get_aggregate(app: &axum::Router, envelope: &str) -> (StatusCode, Value) {
    let uri = format!("/aggregate?json={}", urlencoding::encode(envelope));
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let (status, body, _) = send(app, req).await;
    (status, body)
}

/// `POST /aggregate` with `body` as JSON.
pub async fn post_aggregate(app: &axum::Router, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/aggregate")
        .header("Content-Type", "application/json")
        .header("Content-Length", body.len().to_string())
        .body(Body::from(body.to_string()))
        .expect("request should build");
    let (status, body, _) = send(app, req).await;
    (status, body)
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value, HeaderMap) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

pub fn assert_failure(body: &Value, reason: &str, info: &str) {
    assert_eq!(body["status"]["reason"], json!(reason), "body: {body}");
    assert_eq!(body["status"]["info"], json!(info), "body: {body}");
    assert_eq!(body["status"]["status"], json!("FAILURE"));
    assert_eq!(body["status"]["code"], json!(-1));
}
