//! Startup and teardown of the core.
//!
//! # Order
//! 1. Open storage (schema created or migrated)
//! 2. Build the audit log and config store over the same handle
//! 3. Seed missing config defaults, then load the audit level from them
//! 4. Record `service_start`
//!
//! Any failure before step 4 is fatal.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;

use crate::audit::{AuditLog, LogLevel};
use crate::bridge::Bridge;
use crate::config::{ConfigStore, ServiceConfig};
use crate::storage::{Storage, StorageError};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Everything the service loops and the admin API share.
#[derive(Clone, Debug)]
pub struct Core {
    pub storage: Storage,
    pub audit: AuditLog,
    pub config: ConfigStore,
    pub bridge: Bridge,
}

impl Core {
    /// Wire the stores over an already-open storage handle.
    pub async fn from_storage(storage: Storage) -> Self {
        let audit = AuditLog::new(&storage);
        let config = ConfigStore::new(&storage, audit.clone());
        config.seed_defaults().await;
        let level = config.apply_log_level().await;
        tracing::info!(level = %level, "Audit log level loaded");

        let bridge = Bridge::new(config.clone());
        Self { storage, audit, config, bridge }
    }
}

/// Open storage from the service file and record `service_start`.
pub async fn initialize(service: &ServiceConfig) -> Result<Core, StartupError> {
    let storage = Storage::open(&service.storage.database_url).await?;

    let core = Core::from_storage(storage).await;
    core.audit
        .add_log_entry(
            LogLevel::Info,
            "service_start",
            Some(json!({
                "timestamp": Utc::now().to_rfc3339(),
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
        .await;

    Ok(core)
}

/// Record `service_stop` and close storage.
pub async fn teardown(core: &Core) {
    core.audit
        .add_log_entry(
            LogLevel::Info,
            "service_stop",
            Some(json!({ "timestamp": Utc::now().to_rfc3339() })),
        )
        .await;
    core.storage.close().await;
}
