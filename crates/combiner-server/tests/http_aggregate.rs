mod common;

use anyhow::Result;
use axum::http::StatusCode;
use combiner_core::model::UserModel;
use common::{
    assert_failure, build_test_context, get, get_aggregate, post_aggregate, send, Exploding,
    UserObject, UserObjectLowLevel,
};
use axum::body::Body;
use axum::http::Request;
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn aggregate_ok() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) =
        get_aggregate(&ctx.app, r#"{"seldonMessages":[{"data":{"ndarray":[1]}}]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["tags"], json!({"mytag": 1}));
    assert_eq!(
        body["meta"]["metrics"],
        json!([{"type": "COUNTER", "key": "mycounter", "value": 1}])
    );
    assert_eq!(body["data"]["ndarray"], json!([1]));
    Ok(())
}

#[tokio::test]
async fn aggregate_missing_messages_field() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) =
        get_aggregate(&ctx.app, r#"{"wrong":[{"data":{"ndarray":[1]}}]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(
        &body,
        "MICROSERVICE_BAD_DATA",
        "Request must contain seldonMessages field",
    );
    Ok(())
}

#[tokio::test]
async fn aggregate_messages_not_a_list() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) =
        get_aggregate(&ctx.app, r#"{"seldonMessages":{"data":{"ndarray":[1]}}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "MICROSERVICE_BAD_DATA", "seldonMessages field is not a list");
    Ok(())
}

#[tokio::test]
async fn aggregate_empty_list() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) = get_aggregate(&ctx.app, r#"{"seldonMessages":[]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "MICROSERVICE_BAD_DATA", "seldonMessages field is empty");
    Ok(())
}

#[tokio::test]
async fn aggregate_bad_message() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) =
        get_aggregate(&ctx.app, r#"{"seldonMessages":[{"data2":{"ndarray":[1]}}]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(
        &body,
        "MICROSERVICE_BAD_DATA",
        "Invalid SeldonMessage at index 0 : Request must contain Default Data or binData or strData",
    );
    Ok(())
}

#[tokio::test]
async fn aggregate_two_messages_returns_first() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) = get_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"data":{"ndarray":[1]}},{"data":{"ndarray":[2]}}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["tags"], json!({"mytag": 1}));
    assert_eq!(body["data"]["ndarray"], json!([1]));
    Ok(())
}

#[tokio::test]
async fn aggregate_bin_data_passes_first_through() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) = get_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"binData":"123"},{"binData":"456"}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["tags"], json!({"mytag": 1}));
    assert_eq!(body["binData"], json!("123"));
    Ok(())
}

#[tokio::test]
async fn aggregate_returned_array_is_encoded() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, true))?;
    let (status, body) = get_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"data":{"ndarray":[1]}},{"data":{"ndarray":[2]}}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ndarray"], json!([1, 2, 3]));
    Ok(())
}

#[tokio::test]
async fn aggregate_bad_metrics() -> Result<()> {
    let ctx = build_test_context(UserObject::model(false, false))?;
    let (status, body) = get_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"data":{"ndarray":[1]}},{"data":{"ndarray":[2]}}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"]["reason"], json!("MICROSERVICE_BAD_METRIC"));
    Ok(())
}

#[tokio::test]
async fn aggregate_low_level() -> Result<()> {
    let ctx = build_test_context(UserObjectLowLevel::model())?;
    let (status, body) = get_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"data":{"ndarray":[1]}},{"data":{"ndarray":[2]}}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": {"ndarray": [9, 9]}}));
    Ok(())
}

#[tokio::test]
async fn aggregate_post_body() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) = post_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"strData":"first"},{"strData":"second"}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strData"], json!("first"));
    assert_eq!(body["meta"]["tags"], json!({"mytag": 1}));
    Ok(())
}

#[tokio::test]
async fn aggregate_post_invalid_json() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) = post_aggregate(&ctx.app, r#"{"seldonMessages": ["#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"]["reason"], json!("MICROSERVICE_BAD_DATA"));
    let info = body["status"]["info"].as_str().unwrap_or_default();
    assert!(info.starts_with("Invalid JSON in request"), "info: {info}");
    Ok(())
}

#[tokio::test]
async fn aggregate_get_without_json_parameter() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body, _) = get(&ctx.app, "/aggregate").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "MICROSERVICE_BAD_DATA", "Empty json parameter in data");
    Ok(())
}

#[tokio::test]
async fn aggregate_collaborator_failure_is_internal_error() -> Result<()> {
    let ctx = build_test_context(UserModel::from_aggregate(Arc::new(Exploding)))?;
    let (status, body) =
        get_aggregate(&ctx.app, r#"{"seldonMessages":[{"strData":"x"}]}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_failure(
        &body,
        "MICROSERVICE_INTERNAL_ERROR",
        "Aggregation failed: model exploded",
    );
    Ok(())
}

#[tokio::test]
async fn responses_carry_trace_id() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, _, headers) = get(&ctx.app, "/health/status").await;
    assert_eq!(status, StatusCode::OK);
    let trace_id = headers
        .get("X-Trace-Id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(trace_id.len(), 16);
    Ok(())
}

#[tokio::test]
async fn health_endpoints() -> Result<()> {
    let ctx = build_test_context(UserObjectLowLevel::model())?;
    let (status, body, _) = get(&ctx.app, "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("pong"));

    let (status, body, _) = get(&ctx.app, "/health/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["aggregator"], json!("user"));
    assert_eq!(body["rest_contract"], json!("low-level"));
    assert_eq!(body["grpc_contract"], json!("low-level"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_aggregate() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body, _) = get(&ctx.app, "/v1/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/aggregate"]["get"].is_object());
    assert!(body["paths"]["/aggregate"]["post"].is_object());
    assert!(body["paths"]["/health/ping"].is_object());
    Ok(())
}

#[tokio::test]
async fn aggregate_rejects_ragged_ndarray_with_long_first_rows() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let mut level = Value::Array((0..2000).map(|i| json!(i)).collect());
    for _ in 0..3 {
        let mut items = vec![level];
        items.extend((1..2000).map(|_| json!(0)));
        level = Value::Array(items);
    }
    let envelope = json!({"seldonMessages": [{"data": {"ndarray": level}}]}).to_string();

    let (status, body) = post_aggregate(&ctx.app, &envelope).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"]["reason"], json!("MICROSERVICE_BAD_DATA"));
    let info = body["status"]["info"].as_str().unwrap_or_default();
    assert!(info.starts_with("Invalid SeldonMessage at index 0 : "), "info: {info}");

    let (status, _, _) = get(&ctx.app, "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn aggregate_rejects_overflowing_tensor_shape() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let (status, body) = post_aggregate(
        &ctx.app,
        r#"{"seldonMessages":[{"data":{"tensor":{"shape":[4294967296,4294967296],"values":[]}}}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"]["reason"], json!("MICROSERVICE_BAD_DATA"));
    Ok(())
}

#[tokio::test]
async fn aggregate_post_json_query_takes_precedence() -> Result<()> {
    let ctx = build_test_context(UserObject::model(true, false))?;
    let query = urlencoding::encode(r#"{"seldonMessages":[{"strData":"from query"}]}"#);
    let req = Request::builder()
        .method("POST")
        .uri(format!("/aggregate?json={query}"))
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"seldonMessages":[{"strData":"from body"}]}"#))?;
    let (status, body, _) = send(&ctx.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strData"], json!("from query"));
    Ok(())
}
