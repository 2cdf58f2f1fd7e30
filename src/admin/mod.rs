//! Local admin API.
//!
//! The UI and `bridge-cli` drive the bridge through these routes. Every route
//! requires the configured admin key as a bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::{Core, Shutdown};

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub core: Core,
    pub api_key: Arc<str>,
    pub started_at: Instant,
    /// Live log sockets close when this fires.
    pub shutdown: Shutdown,
}

impl AdminState {
    pub fn new(core: Core, api_key: &str, shutdown: Shutdown) -> Self {
        Self {
            core,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
            shutdown,
        }
    }
}

#[allow(deprecated)]
pub fn setup_admin_router(state: AdminState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/config", get(get_config).post(save_config))
        .route("/api/logs", get(get_logs))
        .route("/api/logs/live", get(live_logs))
        .route("/api/test-connection", post(test_connection))
        .route("/api/send-test-payload", post(send_test_payload))
        .route("/api/sync-now", post(sync_now))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(Shutdown::wait(shutdown))
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
