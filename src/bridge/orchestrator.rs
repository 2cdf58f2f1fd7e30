//! The six user-facing operations plus the heartbeat.
//!
//! Every operation reads fresh API settings from the config store, so edits
//! apply to the next call without a restart. Nothing here returns an error:
//! failures become `OperationResult { success: false, .. }`.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{json, Value};

use crate::audit::{AuditLog, LogLevel, LogQuery};
use crate::bridge::result::OperationResult;
use crate::client::{ApiClient, ApiResult, ClientOptions};
use crate::config::schema::keys;
use crate::config::{ApiConfig, ConfigStore};

/// Orders endpoint, relative to the Orderwise base URL.
const ORDERS_PATH: &str = "orders";

/// Thin orchestrator over the config store, audit log and API client.
#[derive(Clone, Debug)]
pub struct Bridge {
    config: ConfigStore,
    audit: AuditLog,
}

impl Bridge {
    pub fn new(config: ConfigStore) -> Self {
        let audit = config.audit().clone();
        Self { config, audit }
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// All stored config values keyed by name.
    pub async fn get_config(&self) -> OperationResult {
        let values: BTreeMap<String, String> = self
            .config
            .entries()
            .await
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();
        OperationResult::ok("Configuration loaded").with_data(json!(values))
    }

    /// Store a partial set of values.
    ///
    /// Unknown keys reject the whole request. Stored values are then
    /// re-validated so any correction shows up in the audit log.
    pub async fn save_config(&self, values: BTreeMap<String, String>) -> OperationResult {
        let unknown: Vec<&str> = values
            .keys()
            .map(String::as_str)
            .filter(|key| !keys::ALL.contains(key))
            .collect();
        if !unknown.is_empty() {
            return OperationResult::failed(format!("Unknown config keys: {}", unknown.join(", ")));
        }

        let mut failed = Vec::new();
        for (key, value) in &values {
            if !self.config.set(key, value).await {
                failed.push(key.as_str());
            }
        }
        if !failed.is_empty() {
            return OperationResult::failed(format!("Failed to save: {}", failed.join(", ")));
        }

        let saved: Vec<&String> = values.keys().collect();
        self.audit
            .add_log_entry(LogLevel::Info, "CONFIG_SAVED", Some(json!({ "keys": saved })))
            .await;
        self.config.get_api_config().await;

        OperationResult::ok("Configuration saved successfully")
    }

    /// The `limit` most recent audit entries.
    pub async fn get_logs(&self, limit: u32) -> OperationResult {
        self.query_logs(&LogQuery::new().limit(limit)).await
    }

    /// Filtered audit entries.
    pub async fn query_logs(&self, query: &LogQuery) -> OperationResult {
        let logs = self.audit.get_logs(query).await;
        OperationResult::ok(format!("Retrieved {} log entries", logs.len())).with_data(json!(logs))
    }

    /// GET the Orderwise base URL.
    pub async fn test_connection(&self) -> OperationResult {
        let client = match self.orderwise_client().await {
            Ok(client) => client,
            Err(result) => return result,
        };

        match client.check_connection().await {
            Ok(response) => {
                self.audit
                    .add_log_entry(
                        LogLevel::Success,
                        "CONNECTION_TEST_SUCCESS",
                        Some(json!({ "status": response.status })),
                    )
                    .await;
                OperationResult::ok("Connection to Orderwise API successful").with_data(response.data)
            }
            Err(e) => {
                self.audit
                    .add_log_entry(
                        LogLevel::Error,
                        "CONNECTION_TEST_FAILED",
                        Some(json!({ "error": e.to_string(), "status": e.status() })),
                    )
                    .await;
                OperationResult::failed(format!("Connection to Orderwise API failed: {}", e))
            }
        }
    }

    /// POST a fixed test event to the external webhook.
    pub async fn send_test_payload(&self) -> OperationResult {
        let api = self.config.get_api_config().await;
        let client = match self.webhook_client(&api) {
            Ok(client) => client,
            Err(result) => return result,
        };

        let payload = json!({
            "eventType": "test",
            "source": "orderwise-bridge",
            "message": "Test payload from Orderwise Bridge",
            "timestamp": Utc::now().to_rfc3339(),
        });

        match client.post("", payload).await {
            Ok(response) => {
                self.audit
                    .add_log_entry(
                        LogLevel::Success,
                        "TEST_PAYLOAD_SENT",
                        Some(json!({ "url": api.external_webhook_url.as_str(), "status": response.status })),
                    )
                    .await;
                OperationResult::ok("Test payload sent successfully").with_data(response.data)
            }
            Err(e) => {
                self.audit
                    .add_log_entry(
                        LogLevel::Error,
                        "TEST_PAYLOAD_FAILED",
                        Some(json!({ "url": api.external_webhook_url.as_str(), "error": e.to_string() })),
                    )
                    .await;
                OperationResult::failed(format!("Failed to send test payload: {}", e))
            }
        }
    }

    /// Fetch new orders and forward them to the webhook in one batch.
    pub async fn sync_now(&self) -> OperationResult {
        let api = self.config.get_api_config().await;
        let orderwise = match self.client_for(ClientOptions::from(&api)) {
            Ok(client) => client,
            Err(result) => return result,
        };
        let webhook = match self.webhook_client(&api) {
            Ok(client) => client,
            Err(result) => return result,
        };

        let params = BTreeMap::from([("status".to_string(), "new".to_string())]);
        let orders = match orderwise.get(ORDERS_PATH, params).await {
            Ok(response) => match response.data {
                Value::Array(orders) => orders,
                other => {
                    return self
                        .sync_failed("fetch", format!("Unexpected orders response: {}", other))
                        .await
                }
            },
            Err(e) => return self.sync_failed("fetch", e.to_string()).await,
        };

        let fetched = orders.len();
        if fetched == 0 {
            self.audit
                .add_log_entry(LogLevel::Info, "SYNC_COMPLETED", Some(json!({ "fetched": 0, "forwarded": 0 })))
                .await;
            return OperationResult::ok("No new orders to sync")
                .with_data(json!({ "fetched": 0, "forwarded": 0 }));
        }

        let batch = json!({
            "eventType": "orders.sync",
            "count": fetched,
            "orders": orders,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Err(e) = webhook.post("", batch).await {
            return self.sync_failed("forward", e.to_string()).await;
        }

        let summary = json!({ "fetched": fetched, "forwarded": fetched });
        self.audit
            .add_log_entry(LogLevel::Success, "SYNC_COMPLETED", Some(summary.clone()))
            .await;
        OperationResult::ok(format!("Synced {} orders", fetched)).with_data(summary)
    }

    /// Record that the service is alive.
    pub async fn heartbeat(&self) -> Option<i64> {
        let timestamp = Utc::now().to_rfc3339();
        tracing::debug!(timestamp = %timestamp, "Heartbeat");
        self.audit
            .add_log_entry(
                LogLevel::Info,
                "heartbeat",
                Some(json!({ "timestamp": timestamp, "status": "alive" })),
            )
            .await
    }

    async fn sync_failed(&self, stage: &str, error: String) -> OperationResult {
        self.audit
            .add_log_entry(LogLevel::Error, "SYNC_FAILED", Some(json!({ "stage": stage, "error": error })))
            .await;
        OperationResult::failed(format!("Sync failed during {}: {}", stage, error))
    }

    async fn orderwise_client(&self) -> Result<ApiClient, OperationResult> {
        let api = self.config.get_api_config().await;
        self.client_for(ClientOptions::from(&api))
    }

    /// Client bound to the webhook URL. The Orderwise token is not forwarded.
    fn webhook_client(&self, api: &ApiConfig) -> Result<ApiClient, OperationResult> {
        let mut options = ClientOptions::from(api);
        options.base_url = api.external_webhook_url.clone();
        options.bearer_token = String::new();
        self.client_for(options)
    }

    fn client_for(&self, options: ClientOptions) -> Result<ApiClient, OperationResult> {
        let built: ApiResult<ApiClient> = ApiClient::new(options, self.audit.clone());
        built.map_err(|e| {
            tracing::error!(error = %e, "Failed to build API client");
            OperationResult::failed(e.to_string())
        })
    }
}
