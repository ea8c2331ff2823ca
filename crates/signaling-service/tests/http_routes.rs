//! HTTP surface tests.
//!
//! Exercises the assembled Axum router in-process with `oneshot`, backed by
//! a real router actor.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use signaling_service::observability::HealthState;
use signaling_service::routes::{build_routes, AppState};
use signaling_service::transport::TransportConfig;
use signaling_test_utils::{fixtures, settle, spawn_router, TestPeer};
use std::sync::Arc;
use std::time::Instant;
use tower::util::ServiceExt;

const FRONTEND: &str = "http://localhost:5173";

struct TestApp {
    app: Router,
    state: AppState,
}

fn test_app() -> TestApp {
    let router = spawn_router();
    let state = AppState {
        router: router.clone(),
        health: Arc::new(HealthState::new(router.child_token())),
        transport: TransportConfig::default(),
        shutdown: router.child_token(),
        started_at: Instant::now(),
    };
    // Handle without a global recorder; renders whatever was recorded through it.
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
    let app = build_routes(state.clone(), metrics_handle, FRONTEND).expect("routes build");
    TestApp { app, state }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

// ============================================================================
// Probes
// ============================================================================

#[tokio::test]
async fn test_health_is_ok_and_ready_follows_state() {
    let t = test_app();

    let (status, _, _) = get(&t.app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = get(&t.app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    t.state.health.set_ready();
    let (status, _, _) = get(&t.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Status
// ============================================================================

#[tokio::test]
async fn test_status_on_empty_relay() {
    let t = test_app();

    let (status, headers, body) = get(&t.app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json")));

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.get("status").and_then(Value::as_str), Some("ok"));
    assert_eq!(json.get("rooms").and_then(Value::as_u64), Some(0));
    assert_eq!(json.get("totalConnections").and_then(Value::as_u64), Some(0));
    assert!(json.get("uptimeSeconds").and_then(Value::as_u64).is_some());
    assert!(json
        .get("timestamp")
        .and_then(Value::as_str)
        .is_some_and(|ts| chrono::DateTime::parse_from_rfc3339(ts).is_ok()));
    assert_eq!(
        json.get("roomDetails").and_then(Value::as_object).map(|m| m.len()),
        Some(0)
    );
}

#[tokio::test]
async fn test_status_reports_room_membership() {
    let t = test_app();
    let router = &t.state.router;
    let alice = TestPeer::connect(router).await;
    let bob = TestPeer::connect(router).await;
    let _idle = TestPeer::connect(router).await;
    alice.send(router, fixtures::join("standup", "alice")).await;
    bob.send(router, fixtures::join("standup", "bob")).await;
    settle(router).await;

    let (status, _, body) = get(&t.app, "/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.get("rooms").and_then(Value::as_u64), Some(1));
    assert_eq!(json.get("totalConnections").and_then(Value::as_u64), Some(2));

    let room = json
        .get("roomDetails")
        .and_then(|d| d.get("standup"))
        .expect("room listed");
    assert_eq!(room.get("participants").and_then(Value::as_u64), Some(2));
    assert_eq!(
        room.get("sessionIds").cloned(),
        Some(serde_json::json!(["alice", "bob"]))
    );
    let connection_ids = room
        .get("connectionIds")
        .and_then(Value::as_array)
        .expect("connection ids listed");
    assert_eq!(connection_ids.len(), 2);
    assert!(connection_ids.contains(&Value::String(alice.connection_id.to_string())));
    assert!(connection_ids.contains(&Value::String(bob.connection_id.to_string())));
}

#[tokio::test]
async fn test_status_and_health_unavailable_after_router_stops() {
    let t = test_app();
    t.state.health.set_ready();
    t.state.router.shutdown().await.unwrap();

    for uri in ["/status", "/health", "/ready"] {
        let (status, _, _) = get(&t.app, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
    }
}

// ============================================================================
// Metrics
// ============================================================================

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let t = test_app();
    let (status, _, body) = get(&t.app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).is_ok());
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_cors_allows_frontend_origin() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/status")
                .header(header::ORIGIN, FRONTEND)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(FRONTEND)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn test_cors_preflight_lists_methods() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/status")
                .header(header::ORIGIN, FRONTEND)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    for method in ["GET", "POST", "PUT", "DELETE"] {
        assert!(methods.contains(method), "{method} missing from {methods}");
    }
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/status")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_invalid_frontend_url_is_a_config_error() {
    let router = spawn_router();
    let state = AppState {
        router: router.clone(),
        health: Arc::new(HealthState::new(router.child_token())),
        transport: TransportConfig::default(),
        shutdown: router.child_token(),
        started_at: Instant::now(),
    };
    let handle = PrometheusBuilder::new().build_recorder().handle();

    let result = build_routes(state, handle, "http://bad\norigin");
    assert!(matches!(
        result,
        Err(signaling_service::errors::SignalingError::Config(_))
    ));
}

// ============================================================================
// Socket upgrades
// ============================================================================

#[tokio::test]
async fn test_ws_without_upgrade_headers_is_rejected() {
    let t = test_app();
    t.state.health.set_ready();

    let (status, _, _) = get(&t.app, "/ws").await;
    assert!(status.is_client_error(), "plain GET /ws got {status}");
}
