use std::collections::BTreeMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::admin::AdminState;
use crate::audit::LogQuery;
use crate::bridge::OperationResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub log_level: String,
    pub storage_open: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let core = &state.core;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        uptime_secs: state.started_at.elapsed().as_secs(),
        log_level: core.audit.min_level().to_string(),
        storage_open: !core.storage.is_closed(),
    })
}

pub async fn get_config(State(state): State<AdminState>) -> Json<OperationResult> {
    Json(state.core.bridge.get_config().await)
}

pub async fn save_config(
    State(state): State<AdminState>,
    Json(values): Json<BTreeMap<String, String>>,
) -> Json<OperationResult> {
    Json(state.core.bridge.save_config(values).await)
}

pub async fn get_logs(
    State(state): State<AdminState>,
    Query(query): Query<LogQuery>,
) -> Json<OperationResult> {
    Json(state.core.bridge.query_logs(&query).await)
}

pub async fn test_connection(State(state): State<AdminState>) -> Json<OperationResult> {
    Json(state.core.bridge.test_connection().await)
}

pub async fn send_test_payload(State(state): State<AdminState>) -> Json<OperationResult> {
    Json(state.core.bridge.send_test_payload().await)
}

pub async fn sync_now(State(state): State<AdminState>) -> Json<OperationResult> {
    Json(state.core.bridge.sync_now().await)
}

pub async fn live_logs(ws: WebSocketUpgrade, State(state): State<AdminState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_logs(socket, state))
}

/// Push every new audit entry to the socket as a JSON text frame.
async fn stream_logs(socket: WebSocket, state: AdminState) {
    let mut entries = state.core.audit.subscribe();
    let mut shutdown = state.shutdown.subscribe();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("Live log listener connected");

    loop {
        tokio::select! {
            entry = entries.recv() => match entry {
                Ok(entry) => {
                    let Ok(text) = serde_json::to_string(&entry) else { continue };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Live log listener fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            _ = shutdown.recv() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }
    tracing::debug!("Live log listener disconnected");
}
