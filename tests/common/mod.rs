//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use orderwise_bridge::audit::{AuditLog, LogEntry, LogLevel, LogQuery};
use orderwise_bridge::bridge::Bridge;
use orderwise_bridge::client::{ApiClient, ClientOptions};
use orderwise_bridge::config::schema::keys;
use orderwise_bridge::config::ConfigStore;
use orderwise_bridge::lifecycle::Core;
use orderwise_bridge::mock::MockServer;
use orderwise_bridge::storage::Storage;
use tokio::net::TcpListener;
use url::Url;

/// Bearer token configured for the harness.
pub const TEST_TOKEN: &str = "test-token-0123456789";

/// Retry delay factor used by the harness, small enough to keep tests fast.
pub const DELAY_FACTOR_MS: u64 = 10;

/// In-memory stores wired to a running mock server.
pub struct Harness {
    pub core: Core,
    pub mock: MockServer,
}

impl Harness {
    pub async fn start() -> Self {
        let mock = MockServer::start("127.0.0.1:0").await.unwrap();
        let storage = Storage::open_in_memory().await.unwrap();
        let core = Core::from_storage(storage).await;

        let config = &core.config;
        config.set(keys::CURRENT_LOG_LEVEL, "DEBUG").await;
        config.set(keys::ORDERWISE_BASE_URL, &mock.orderwise_url()).await;
        config.set(keys::ORDERWISE_BEARER_TOKEN, TEST_TOKEN).await;
        config.set(keys::EXTERNAL_WEBHOOK_URL, &mock.webhook_url()).await;
        config.set(keys::RETRY_DELAY_FACTOR_MS, &DELAY_FACTOR_MS.to_string()).await;

        Self { core, mock }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.core.audit
    }

    pub fn config(&self) -> &ConfigStore {
        &self.core.config
    }

    pub fn bridge(&self) -> &Bridge {
        &self.core.bridge
    }

    /// Client bound to the mock Orderwise API.
    pub fn client(&self, max_retries: u32) -> ApiClient {
        ApiClient::new(self.options(max_retries), self.audit().clone()).unwrap()
    }

    pub fn options(&self, max_retries: u32) -> ClientOptions {
        ClientOptions {
            base_url: Url::parse(&self.mock.orderwise_url()).unwrap(),
            bearer_token: TEST_TOKEN.to_string(),
            timeout: Duration::from_secs(5),
            max_retries,
            retry_delay_factor: Duration::from_millis(DELAY_FACTOR_MS),
        }
    }

    /// Entries with the given event tag, oldest first.
    pub async fn events(&self, event: &str) -> Vec<LogEntry> {
        let mut entries = self
            .audit()
            .get_logs(&LogQuery::new().event(event).limit(1000))
            .await;
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    pub async fn count_level(&self, level: LogLevel) -> usize {
        self.audit()
            .get_logs(&LogQuery::new().level(level).limit(1000))
            .await
            .len()
    }
}

/// A URL on a local port that refuses connections.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/orderwise", addr)
}
