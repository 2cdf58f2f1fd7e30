//! Local stand-in for the Orderwise API and the external webhook.
//!
//! Used by the integration tests and by the `mock-api` binary for manual runs.
//! Each [`MockState`] has its own retry counter, so parallel servers do not
//! interfere.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const SLOW_RESPONSE_DELAY: Duration = Duration::from_secs(2);

/// Path prefix of the Orderwise API on the mock server.
pub const ORDERWISE_PREFIX: &str = "/api/orderwise";

/// Shared state of one mock server.
#[derive(Clone, Default)]
pub struct MockState {
    retry_counter: Arc<AtomicU32>,
    webhook_payloads: Arc<Mutex<Vec<Value>>>,
}

impl MockState {
    /// Bodies received on `/webhook`, oldest first.
    pub async fn webhook_payloads(&self) -> Vec<Value> {
        self.webhook_payloads.lock().await.clone()
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/orderwise", get(orderwise_root))
        .route("/api/orderwise/", get(orderwise_root))
        .route("/api/orderwise/orders", get(list_orders))
        .route("/mock/orderwise/v1/orders", post(create_order))
        .route("/webhook", post(receive_webhook))
        .route("/mock/external-webhook/event", post(receive_event))
        .route("/api/orderwise/mock/test/orderwise-success", get(orderwise_success))
        .route("/mock/test/webhook-receive", post(webhook_receive))
        .route("/api/orderwise/mock/test/retry-then-success", get(retry_then_success))
        .route("/api/orderwise/mock/test/always-fail", get(always_fail))
        .route("/api/orderwise/mock/test/slow", get(slow))
        .route("/api/orderwise/mock/test/client-error", post(client_error))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// A mock server running on a background task. Stops when dropped.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: MockState,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind `addr` (use port 0 for an ephemeral port) and start serving.
    pub async fn start(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let state = MockState::default();
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock API server failed");
            }
        });

        tracing::info!(address = %addr, "Mock API running");
        Ok(Self { addr, state, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Orderwise base URL, suitable for `api.orderwise.baseUrl`.
    pub fn orderwise_url(&self) -> String {
        format!("{}{}", self.base_url(), ORDERWISE_PREFIX)
    }

    /// Webhook URL, suitable for `api.externalwebhook.url`.
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.base_url())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    tracing::debug!(method = %request.method(), uri = %request.uri(), "Mock API request");
    next.run(request).await
}

async fn orderwise_root() -> Json<Value> {
    Json(json!({ "success": true, "message": "Connection to mock Orderwise API successful." }))
}

#[derive(Debug, Deserialize)]
struct OrdersQuery {
    status: Option<String>,
}

async fn list_orders(Query(query): Query<OrdersQuery>) -> Json<Value> {
    if query.status.as_deref() == Some("new") {
        Json(json!([
            { "id": 1, "product": "Widget", "quantity": 2 },
            { "id": 2, "product": "Gadget", "quantity": 1 },
        ]))
    } else {
        Json(json!([]))
    }
}

async fn create_order(Json(order): Json<Value>) -> Response {
    let items = match order.get("items").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items.clone(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": "Order items are required." })),
            )
                .into_response()
        }
    };

    let total: f64 = items
        .iter()
        .map(|item| {
            let price = item.get("price").and_then(Value::as_f64).unwrap_or(0.0);
            let quantity = item.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
            price * quantity
        })
        .sum();

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "orderId": format!("ORD-{}", Utc::now().timestamp_millis()),
                "status": "Pending",
                "items": items,
                "totalAmount": total,
            },
            "message": "Order created successfully",
        })),
    )
        .into_response()
}

async fn receive_webhook(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    tracing::info!(body = %body, "Mock webhook received data");
    state.webhook_payloads.lock().await.push(body);
    Json(json!({ "success": true, "message": "Webhook received data successfully." }))
}

async fn receive_event(Json(event): Json<Value>) -> Response {
    match event.get("eventType").and_then(Value::as_str) {
        Some(event_type) => Json(json!({
            "success": true,
            "message": format!("Webhook event '{}' received successfully.", event_type),
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "eventType is required." })),
        )
            .into_response(),
    }
}

async fn orderwise_success() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Orderwise API test endpoint: Success!",
        "data": { "timestamp": Utc::now().to_rfc3339() },
    }))
}

async fn webhook_receive(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "External Webhook test endpoint: Data received!",
        "dataReceived": body,
    }))
}

/// 500 on the first two calls, then 200 with the call count. Resets after success.
async fn retry_then_success(State(state): State<MockState>) -> Response {
    let attempt = state.retry_counter.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= 2 {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": format!("Service unavailable (Attempt {})", attempt),
            })),
        )
            .into_response();
    }

    state.retry_counter.store(0, Ordering::SeqCst);
    Json(json!({ "success": true, "message": "Finally succeeded!", "attempt": attempt })).into_response()
}

async fn always_fail() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "success": false, "message": "Service consistently unavailable" })),
    )
        .into_response()
}

/// Answers after [`SLOW_RESPONSE_DELAY`], for client timeout runs.
async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
    Json(json!({ "success": true, "message": "Slow response" }))
}

async fn client_error(body: Bytes) -> Response {
    let data = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|body| body.get("data").filter(|d| !d.is_null()).cloned());
    let message = match &data {
        None => json!({ "success": false, "message": "Client Error: Missing \"data\" in request body." }),
        Some(data) => json!({
            "success": false,
            "message": "Simulated Client Error: Invalid input.",
            "receivedData": data,
        }),
    };
    (StatusCode::BAD_REQUEST, Json(message)).into_response()
}
