//! Persistent key/value configuration store.
//!
//! # Responsibilities
//! - String get/set/delete over the `config` table
//! - Seeding defaults on first start
//! - Building a validated [`ApiConfig`], recording each correction as a WARNING audit event
//! - Keeping the audit log's minimum level in step with `currentLogLevel`

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::audit::{AuditLog, LogLevel};
use crate::config::schema::{defaults, keys, ApiConfig};
use crate::config::validation::{
    absolute_url, non_negative_int, positive_int, validate, Checked, Correction,
};
use crate::storage::schema::NOW_EXPR;
use crate::storage::Storage;

/// One row of the `config` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Key/value store backed by the shared storage handle.
///
/// Reads never fail: storage errors are logged to the console and the
/// caller's default is returned.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    pool: SqlitePool,
    audit: AuditLog,
}

impl ConfigStore {
    pub fn new(storage: &Storage, audit: AuditLog) -> Self {
        Self {
            pool: storage.pool().clone(),
            audit,
        }
    }

    /// The audit log this store reports to.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Stored value for `key`, or `None` if absent or unreadable.
    pub async fn get(&self, key: &str) -> Option<String> {
        let result: Result<Option<(Option<String>,)>, sqlx::Error> =
            sqlx::query_as("SELECT value FROM config WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await;

        match result {
            Ok(row) => row.and_then(|(value,)| value),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to get config value");
                None
            }
        }
    }

    /// Stored value for `key`, or `default`.
    pub async fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).await.unwrap_or_else(|| default.to_string())
    }

    /// Insert or replace `key`. Returns whether the write succeeded.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        let sql = format!(
            "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?, ?, {})",
            NOW_EXPR
        );
        match sqlx::query(&sql).bind(key).bind(value).execute(&self.pool).await {
            Ok(_) => {
                tracing::debug!(key = %key, "Config value set");
                if key == keys::CURRENT_LOG_LEVEL {
                    self.audit.set_min_level(LogLevel::parse_or_info(value));
                }
                true
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to set config value");
                false
            }
        }
    }

    /// Remove `key`. Returns whether a row was deleted.
    pub async fn delete(&self, key: &str) -> bool {
        let result = sqlx::query("DELETE FROM config WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                if key == keys::CURRENT_LOG_LEVEL {
                    self.audit.set_min_level(LogLevel::default());
                }
                tracing::info!(key = %key, "Config value deleted");
                self.audit
                    .add_log_entry(LogLevel::Info, "CONFIG_DELETE_SUCCESS", Some(json!({ "key": key })))
                    .await;
                true
            }
            Ok(_) => {
                tracing::info!(key = %key, "No config value found to delete");
                self.audit
                    .add_log_entry(LogLevel::Warning, "CONFIG_DELETE_NOT_FOUND", Some(json!({ "key": key })))
                    .await;
                false
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to delete config value");
                self.audit
                    .add_log_entry(
                        LogLevel::Error,
                        "CONFIG_DELETE_FAILED",
                        Some(json!({ "key": key, "error": e.to_string() })),
                    )
                    .await;
                false
            }
        }
    }

    /// Full row for `key`.
    pub async fn entry(&self, key: &str) -> Option<ConfigEntry> {
        sqlx::query_as::<_, ConfigEntry>(
            "SELECT key, COALESCE(value, '') AS value, updated_at FROM config WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(key = %key, error = %e, "Failed to get config entry");
            None
        })
    }

    /// All rows, ordered by key.
    pub async fn entries(&self) -> Vec<ConfigEntry> {
        sqlx::query_as::<_, ConfigEntry>(
            "SELECT key, COALESCE(value, '') AS value, updated_at FROM config ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to list config entries");
            Vec::new()
        })
    }

    /// Write the default for every missing key. Returns how many were written.
    pub async fn seed_defaults(&self) -> usize {
        let sql = format!(
            "INSERT OR IGNORE INTO config (key, value, updated_at) VALUES (?, ?, {})",
            NOW_EXPR
        );
        let mut written = 0;
        for (key, value) in defaults::seed() {
            match sqlx::query(&sql).bind(key).bind(&value).execute(&self.pool).await {
                Ok(done) => written += done.rows_affected() as usize,
                Err(e) => tracing::error!(key = %key, error = %e, "Failed to seed config default"),
            }
        }
        if written > 0 {
            tracing::info!(written, "Seeded config defaults");
        }
        written
    }

    /// Re-read `currentLogLevel` and push it into the audit log's filter.
    pub async fn apply_log_level(&self) -> LogLevel {
        self.audit.refresh_min_level().await
    }

    /// Build the API settings, replacing invalid values with defaults.
    ///
    /// Each replacement is recorded as one WARNING audit event. A missing or
    /// placeholder bearer token is flagged but does not block anything.
    pub async fn get_api_config(&self) -> ApiConfig {
        let fallback = ApiConfig::default();

        let timeout = validate(
            keys::CLIENT_TIMEOUT_MS,
            self.get(keys::CLIENT_TIMEOUT_MS).await.as_deref(),
            fallback.client_timeout_ms,
            positive_int,
        );
        let max_attempts = validate(
            keys::RETRY_MAX_ATTEMPTS,
            self.get(keys::RETRY_MAX_ATTEMPTS).await.as_deref(),
            fallback.retry_max_attempts,
            non_negative_int,
        );
        let delay_factor = validate(
            keys::RETRY_DELAY_FACTOR_MS,
            self.get(keys::RETRY_DELAY_FACTOR_MS).await.as_deref(),
            fallback.retry_delay_factor_ms,
            positive_int,
        );
        let base_url = validate(
            keys::ORDERWISE_BASE_URL,
            self.get(keys::ORDERWISE_BASE_URL).await.as_deref(),
            fallback.base_url.clone(),
            absolute_url,
        );
        let webhook_url = validate(
            keys::EXTERNAL_WEBHOOK_URL,
            self.get(keys::EXTERNAL_WEBHOOK_URL).await.as_deref(),
            fallback.external_webhook_url.clone(),
            absolute_url,
        );

        let config = ApiConfig {
            client_timeout_ms: self.take(timeout, "CONFIG_VALIDATION_INVALID").await,
            retry_max_attempts: self.take(max_attempts, "CONFIG_VALIDATION_INVALID").await,
            retry_delay_factor_ms: self.take(delay_factor, "CONFIG_VALIDATION_INVALID").await,
            base_url: self.take(base_url, "CONFIG_VALIDATION_INVALID_URL").await,
            external_webhook_url: self.take(webhook_url, "CONFIG_VALIDATION_INVALID_URL").await,
            bearer_token: self.get_or(keys::ORDERWISE_BEARER_TOKEN, defaults::BEARER_TOKEN).await,
        };

        if config.has_placeholder_token() {
            tracing::warn!("Orderwise bearer token is not configured");
            self.audit
                .add_log_entry(
                    LogLevel::Warning,
                    "CONFIG_VALIDATION_DEFAULT_TOKEN",
                    Some(json!({ "key": keys::ORDERWISE_BEARER_TOKEN })),
                )
                .await;
        }

        config
    }

    /// Unwrap a checked value, recording its correction if any.
    async fn take<T>(&self, checked: Checked<T>, event: &str) -> T {
        if let Some(correction) = &checked.correction {
            self.report_correction(event, correction).await;
        }
        checked.value
    }

    async fn report_correction(&self, event: &str, correction: &Correction) {
        tracing::warn!(
            key = %correction.key,
            value = %correction.value,
            using_default = %correction.using_default,
            "Invalid config value replaced by default"
        );
        self.audit
            .add_log_entry(
                LogLevel::Warning,
                event,
                Some(json!({
                    "key": correction.key,
                    "value": correction.value,
                    "usingDefault": correction.using_default,
                })),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogQuery;

    async fn stores() -> (Storage, ConfigStore) {
        let storage = Storage::open_in_memory().await.unwrap();
        let audit = AuditLog::new(&storage);
        let config = ConfigStore::new(&storage, audit);
        (storage, config)
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let (_storage, store) = stores().await;
        assert!(store.set("api.orderwise.baseUrl", "http://erp.local/api").await);
        assert_eq!(store.get("api.orderwise.baseUrl").await.as_deref(), Some("http://erp.local/api"));

        assert!(store.set("api.orderwise.baseUrl", "http://erp2.local/api").await);
        assert_eq!(store.get_or("api.orderwise.baseUrl", "x").await, "http://erp2.local/api");
        assert_eq!(store.get_or("missing.key", "fallback").await, "fallback");
    }

    #[tokio::test]
    async fn test_entry_has_timestamp() {
        let (_storage, store) = stores().await;
        let before = Utc::now() - chrono::Duration::seconds(5);
        store.set("k", "v").await;

        let entry = store.entry("k").await.unwrap();
        assert_eq!(entry.value, "v");
        assert!(entry.updated_at > before);
        assert!(store.entry("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_records_audit_events() {
        let (_storage, store) = stores().await;
        store.set("temp.key", "1").await;

        assert!(store.delete("temp.key").await);
        assert!(!store.delete("temp.key").await);
        assert!(store.get("temp.key").await.is_none());

        let audit = store.audit();
        let ok = audit.get_logs(&LogQuery::new().event("CONFIG_DELETE_SUCCESS")).await;
        let missing = audit.get_logs(&LogQuery::new().event("CONFIG_DELETE_NOT_FOUND")).await;
        assert_eq!(ok.len(), 1);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].level, LogLevel::Warning);
    }

    #[tokio::test]
    async fn test_storage_failure_returns_defaults() {
        let (storage, store) = stores().await;
        storage.close().await;

        assert!(store.get("anything").await.is_none());
        assert_eq!(store.get_or("anything", "d").await, "d");
        assert!(!store.set("anything", "v").await);
        assert!(!store.delete("anything").await);
        assert!(store.entries().await.is_empty());

        let config = store.get_api_config().await;
        assert_eq!(config, ApiConfig::default());
    }

    #[tokio::test]
    async fn test_seed_defaults_only_fills_missing() {
        let (_storage, store) = stores().await;
        store.set(keys::RETRY_MAX_ATTEMPTS, "7").await;

        assert_eq!(store.seed_defaults().await, 6);
        assert_eq!(store.seed_defaults().await, 0);
        assert_eq!(store.get(keys::RETRY_MAX_ATTEMPTS).await.as_deref(), Some("7"));
        assert_eq!(store.get(keys::CURRENT_LOG_LEVEL).await.as_deref(), Some("INFO"));
        assert_eq!(store.entries().await.len(), 7);
    }

    #[tokio::test]
    async fn test_log_level_follows_config() {
        let (_storage, store) = stores().await;
        let audit = store.audit().clone();

        store.set(keys::CURRENT_LOG_LEVEL, "ERROR").await;
        assert_eq!(audit.min_level(), LogLevel::Error);
        assert!(audit.add_log_entry(LogLevel::Warning, "quiet", None).await.is_none());

        store.set(keys::CURRENT_LOG_LEVEL, "DEBUG").await;
        assert!(audit.add_log_entry(LogLevel::Debug, "loud", None).await.is_some());

        store.set(keys::CURRENT_LOG_LEVEL, "NOT_A_LEVEL").await;
        assert_eq!(audit.min_level(), LogLevel::Info);

        store.set(keys::CURRENT_LOG_LEVEL, "WARNING").await;
        audit.set_min_level(LogLevel::Debug);
        assert_eq!(store.apply_log_level().await, LogLevel::Warning);
        assert_eq!(audit.min_level(), LogLevel::Warning);
    }

    #[tokio::test]
    async fn test_api_config_valid_values_produce_no_warnings() {
        let (_storage, store) = stores().await;
        store.seed_defaults().await;
        store.set(keys::ORDERWISE_BEARER_TOKEN, "real-token").await;
        store.set(keys::CLIENT_TIMEOUT_MS, "2500").await;
        store.set(keys::RETRY_MAX_ATTEMPTS, "0").await;

        let config = store.get_api_config().await;
        assert_eq!(config.client_timeout_ms, 2500);
        assert_eq!(config.retry_max_attempts, 0);
        assert_eq!(config.bearer_token, "real-token");

        let warnings = store.audit().get_logs(&LogQuery::new().level(LogLevel::Warning)).await;
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_api_config_corrects_each_invalid_value_once() {
        let (_storage, store) = stores().await;
        store.set(keys::ORDERWISE_BEARER_TOKEN, "real-token").await;
        store.set(keys::CLIENT_TIMEOUT_MS, "abc").await;
        store.set(keys::RETRY_MAX_ATTEMPTS, "-2").await;
        store.set(keys::RETRY_DELAY_FACTOR_MS, "0").await;
        store.set(keys::ORDERWISE_BASE_URL, "not a url").await;
        store.set(keys::EXTERNAL_WEBHOOK_URL, "ftp//broken").await;

        let config = store.get_api_config().await;
        assert_eq!(config, {
            let mut expected = ApiConfig::default();
            expected.bearer_token = "real-token".into();
            expected
        });

        let audit = store.audit();
        let numeric = audit.get_logs(&LogQuery::new().event("CONFIG_VALIDATION_INVALID")).await;
        let urls = audit.get_logs(&LogQuery::new().event("CONFIG_VALIDATION_INVALID_URL")).await;
        assert_eq!(numeric.len(), 3);
        assert_eq!(urls.len(), 2);

        let timeout = audit
            .get_logs(&LogQuery::new().event("CONFIG_VALIDATION_INVALID").search(keys::CLIENT_TIMEOUT_MS))
            .await;
        assert_eq!(
            timeout[0].data,
            Some(json!({"key": keys::CLIENT_TIMEOUT_MS, "value": "abc", "usingDefault": "10000"}))
        );
    }

    #[tokio::test]
    async fn test_placeholder_token_is_flagged_not_blocking() {
        let (_storage, store) = stores().await;
        store.seed_defaults().await;

        let config = store.get_api_config().await;
        assert_eq!(config.bearer_token, defaults::BEARER_TOKEN);

        let flagged = store
            .audit()
            .get_logs(&LogQuery::new().event("CONFIG_VALIDATION_DEFAULT_TOKEN"))
            .await;
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].level, LogLevel::Warning);
    }
}
