//! Tests for /health, /validate and /auto-login.

#[path = "../common/mod.rs"]
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::json;
use tower::ServiceExt;

fn seed_key(state: &AppState, expires_at: Option<i64>) -> String {
    let conn = state.db.get().unwrap();
    create_test_key(&conn, expires_at).key
}

#[tokio::test]
async fn test_health() {
    let app = test_app(create_test_app_state());

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_validate_binds_then_confirms() {
    let state = create_test_app_state();
    let key = seed_key(&state, None);
    let app = test_app(state);

    let (status, json) = post_json(&app, "/validate", json!({"key": key, "hwid": "dev-1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"], "bound_now");
    assert_eq!(json["message"], "License key validated and HWID bound");
    assert!(json.get("key").is_none(), "validate never echoes the key");

    let (status, json) = post_json(&app, "/validate", json!({"key": key, "hwid": "dev-1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"], "already_bound");
    assert_eq!(json["message"], "License key and HWID validated");
}

#[tokio::test]
async fn test_validate_rejections_answer_200_with_error_status() {
    let state = create_test_app_state();
    let key = seed_key(&state, None);
    let app = test_app(state);

    post_json(&app, "/validate", json!({"key": key, "hwid": "dev-1"})).await;

    let (status, json) = post_json(&app, "/validate", json!({"key": key, "hwid": "dev-2"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["result"], "hwid_mismatch");
    assert_eq!(json["message"], "HWID does not match the license key");

    let (status, json) =
        post_json(&app, "/validate", json!({"key": "bogus", "hwid": "dev-1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["result"], "invalid_key");
    assert_eq!(json["message"], "Invalid license key");
}

#[tokio::test]
async fn test_validate_expired_and_disabled() {
    let state = create_test_app_state();
    let expired = seed_key(&state, Some(now() - ONE_DAY));
    let disabled = seed_key(&state, None);
    {
        let conn = state.db.get().unwrap();
        engine::disable(&conn, &disabled).unwrap();
    }
    let app = test_app(state);

    let (_, json) = post_json(&app, "/validate", json!({"key": expired, "hwid": "dev-1"})).await;
    assert_eq!(json["result"], "expired");
    assert_eq!(json["message"], "License key has expired");

    let (_, json) = post_json(&app, "/validate", json!({"key": disabled, "hwid": "dev-1"})).await;
    assert_eq!(json["result"], "disabled");
    assert_eq!(json["message"], "License key is disabled");
}

#[tokio::test]
async fn test_validate_hwid_conflict() {
    let state = create_test_app_state();
    let first = seed_key(&state, None);
    let second = seed_key(&state, None);
    let app = test_app(state);

    post_json(&app, "/validate", json!({"key": first, "hwid": "dev-1"})).await;
    let (status, json) =
        post_json(&app, "/validate", json!({"key": second, "hwid": "dev-1"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["result"], "hwid_conflict");
}

#[tokio::test]
async fn test_validate_records_name() {
    let state = create_test_app_state();
    let key = seed_key(&state, None);
    let app = test_app(state.clone());

    post_json(
        &app,
        "/validate",
        json!({"key": key, "hwid": "dev-1", "name": "Alice"}),
    )
    .await;

    let conn = state.db.get().unwrap();
    assert_eq!(fetch(&conn, &key).name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn test_validate_blank_hwid_is_400() {
    let state = create_test_app_state();
    let key = seed_key(&state, None);
    let app = test_app(state);

    let (status, json) = post_json(&app, "/validate", json!({"key": key, "hwid": "  "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn test_validate_missing_field_is_client_error() {
    let app = test_app(create_test_app_state());

    let (status, json) = post_json(&app, "/validate", json!({"key": "abc"})).await;

    assert!(status.is_client_error(), "got {}", status);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn test_validate_malformed_json_is_client_error() {
    let app = test_app(create_test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/validate")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_auto_login_returns_key() {
    let state = create_test_app_state();
    let key = seed_key(&state, None);
    let app = test_app(state);

    post_json(&app, "/validate", json!({"key": key, "hwid": "dev-1"})).await;
    let (status, json) = post_json(&app, "/auto-login", json!({"hwid": "dev-1"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"], "login");
    assert_eq!(json["key"], key);
    assert_eq!(json["message"], "Auto-login successful");
}

#[tokio::test]
async fn test_auto_login_without_binding() {
    let app = test_app(create_test_app_state());

    let (status, json) = post_json(&app, "/auto-login", json!({"hwid": "dev-unknown"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["result"], "no_binding");
    assert_eq!(json["message"], "No key bound to this HWID");
    assert!(json.get("key").is_none());
}
