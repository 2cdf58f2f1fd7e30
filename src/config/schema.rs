//! Configuration schema definitions.
//!
//! Two kinds of configuration live here:
//! - [`ServiceConfig`]: process-level settings read once from a TOML file
//! - [`ApiConfig`]: API settings derived from the config store at runtime

use serde::{Deserialize, Serialize};
use url::Url;

/// Config store keys.
pub mod keys {
    pub const CURRENT_LOG_LEVEL: &str = "currentLogLevel";
    pub const ORDERWISE_BASE_URL: &str = "api.orderwise.baseUrl";
    pub const ORDERWISE_BEARER_TOKEN: &str = "api.orderwise.bearerToken";
    pub const EXTERNAL_WEBHOOK_URL: &str = "api.externalwebhook.url";
    pub const CLIENT_TIMEOUT_MS: &str = "api.client.timeoutMs";
    pub const RETRY_MAX_ATTEMPTS: &str = "api.retry.maxAttempts";
    pub const RETRY_DELAY_FACTOR_MS: &str = "api.retry.delayFactorMs";

    /// Every key the bridge reads or writes.
    pub const ALL: [&str; 7] = [
        CURRENT_LOG_LEVEL,
        ORDERWISE_BASE_URL,
        ORDERWISE_BEARER_TOKEN,
        EXTERNAL_WEBHOOK_URL,
        CLIENT_TIMEOUT_MS,
        RETRY_MAX_ATTEMPTS,
        RETRY_DELAY_FACTOR_MS,
    ];
}

/// Hard-coded fallbacks for the config store.
pub mod defaults {
    pub const LOG_LEVEL: &str = "INFO";
    pub const BASE_URL: &str = "http://localhost:3001/api/orderwise";
    /// Placeholder shipped with a fresh install; flagged on every read.
    pub const BEARER_TOKEN: &str = "YOUR_ORDERWISE_BEARER_TOKEN";
    pub const EXTERNAL_WEBHOOK_URL: &str = "http://localhost:3002/webhook";
    pub const CLIENT_TIMEOUT_MS: u64 = 10_000;
    pub const RETRY_MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY_FACTOR_MS: u64 = 1_000;

    /// Initial store contents, written only for missing keys.
    pub fn seed() -> [(&'static str, String); 7] {
        use super::keys;
        [
            (keys::CURRENT_LOG_LEVEL, LOG_LEVEL.to_string()),
            (keys::ORDERWISE_BASE_URL, BASE_URL.to_string()),
            (keys::ORDERWISE_BEARER_TOKEN, BEARER_TOKEN.to_string()),
            (keys::EXTERNAL_WEBHOOK_URL, EXTERNAL_WEBHOOK_URL.to_string()),
            (keys::CLIENT_TIMEOUT_MS, CLIENT_TIMEOUT_MS.to_string()),
            (keys::RETRY_MAX_ATTEMPTS, RETRY_MAX_ATTEMPTS.to_string()),
            (keys::RETRY_DELAY_FACTOR_MS, RETRY_DELAY_FACTOR_MS.to_string()),
        ]
    }
}

/// Validated API settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: Url,
    pub bearer_token: String,
    pub external_webhook_url: Url,
    pub client_timeout_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_delay_factor_ms: u64,
}

impl ApiConfig {
    /// Whether the bearer token is empty or still the shipped placeholder.
    pub fn has_placeholder_token(&self) -> bool {
        self.bearer_token.is_empty() || self.bearer_token == defaults::BEARER_TOKEN
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(defaults::BASE_URL).expect("default base url is valid"),
            bearer_token: defaults::BEARER_TOKEN.to_string(),
            external_webhook_url: Url::parse(defaults::EXTERNAL_WEBHOOK_URL)
                .expect("default webhook url is valid"),
            client_timeout_ms: defaults::CLIENT_TIMEOUT_MS,
            retry_max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            retry_delay_factor_ms: defaults::RETRY_DELAY_FACTOR_MS,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("bearer_token", &"<redacted>")
            .field("external_webhook_url", &self.external_webhook_url.as_str())
            .field("client_timeout_ms", &self.client_timeout_ms)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_delay_factor_ms", &self.retry_delay_factor_ms)
            .finish()
    }
}

/// Root configuration for the bridge service process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Database location.
    pub storage: StorageConfig,

    /// Background loop settings.
    pub service: LoopConfig,

    /// Local admin API used by the UI and `bridge-cli`.
    pub admin: AdminConfig,

    /// Console logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL, e.g. `sqlite://bridge.sqlite` or `sqlite::memory:`.
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bridge.sqlite".to_string(),
        }
    }
}

/// Heartbeat and sync loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Seconds between `heartbeat` audit entries.
    pub heartbeat_interval_secs: u64,

    /// Run the periodic sync loop.
    pub sync_enabled: bool,

    /// Seconds between automatic syncs.
    pub sync_interval_secs: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 60,
            sync_enabled: false,
            sync_interval_secs: 300,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Bind address (loopback by default).
    pub bind_address: String,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Console log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of the pretty format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
