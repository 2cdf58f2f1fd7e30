//! Admin API routes, authentication and the live log socket.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use orderwise_bridge::admin::{self, AdminState};
use orderwise_bridge::config::schema::keys;
use orderwise_bridge::lifecycle::Shutdown;
use orderwise_bridge::LogLevel;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tower::ServiceExt;

mod common;

use common::Harness;

const KEY: &str = "admin-test-key";

fn router(h: &Harness, shutdown: Shutdown) -> Router {
    let state = AdminState::new(h.core.clone(), KEY, shutdown);
    admin::setup_admin_router(state, Duration::from_secs(30))
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", KEY));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_requests_without_key_are_rejected() {
    let h = Harness::start().await;
    let app = router(&h, Shutdown::new());

    let missing = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/status")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status() {
    let h = Harness::start().await;
    let (status, body) = call(router(&h, Shutdown::new()), request("GET", "/api/status", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("running"));
    assert_eq!(body["logLevel"], json!("DEBUG"));
    assert_eq!(body["storageOpen"], json!(true));
}

#[tokio::test]
async fn test_config_round_trip() {
    let h = Harness::start().await;
    let app = router(&h, Shutdown::new());

    let (status, saved) = call(
        app.clone(),
        request("POST", "/api/config", Some(json!({ (keys::CURRENT_LOG_LEVEL): "ERROR" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["success"], json!(true));
    assert_eq!(h.audit().min_level(), LogLevel::Error);

    let (_, loaded) = call(app, request("GET", "/api/config", None)).await;
    assert_eq!(loaded["data"][keys::CURRENT_LOG_LEVEL], json!("ERROR"));
}

#[tokio::test]
async fn test_logs_query_filters() {
    let h = Harness::start().await;
    h.bridge().heartbeat().await;
    h.audit()
        .add_log_entry(LogLevel::Error, "SYNC_FAILED", Some(json!({ "stage": "fetch" })))
        .await;

    let (status, body) = call(
        router(&h, Shutdown::new()),
        request("GET", "/api/logs?level=ERROR&search=fetch&limit=5", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["event"], json!("SYNC_FAILED"));
}

#[tokio::test]
async fn test_logs_reject_negative_paging() {
    let h = Harness::start().await;
    let app = router(&h, Shutdown::new());

    let (status, _) = call(app.clone(), request("GET", "/api/logs?limit=-1", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(app, request("GET", "/api/logs?offset=-1", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operations_are_exposed() {
    let h = Harness::start().await;
    let app = router(&h, Shutdown::new());

    let (_, connection) = call(app.clone(), request("POST", "/api/test-connection", None)).await;
    assert_eq!(connection["success"], json!(true));

    let (_, sync) = call(app, request("POST", "/api/sync-now", None)).await;
    assert_eq!(sync["success"], json!(true));
    assert_eq!(sync["data"]["forwarded"], json!(2));
}

#[tokio::test]
async fn test_live_logs_stream_new_entries() {
    let h = Harness::start().await;
    let shutdown = Shutdown::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(admin::serve(listener, router(&h, shutdown.clone()), shutdown.subscribe()));

    let mut ws_request = format!("ws://{}/api/logs/live", addr).into_client_request().unwrap();
    ws_request
        .headers_mut()
        .insert("authorization", format!("Bearer {}", KEY).parse().unwrap());
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_request).await.unwrap();

    // The server subscribes after the upgrade completes, so keep writing until one arrives.
    let bridge = h.bridge().clone();
    let writer = tokio::spawn(async move {
        loop {
            bridge.heartbeat().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    writer.abort();

    let entry: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
    assert_eq!(entry["event"], json!("heartbeat"));
    assert_eq!(entry["level"], json!("INFO"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
