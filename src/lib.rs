//! Orderwise bridge library.
//!
//! Pulls orders from the Orderwise ERP API and forwards them to an external
//! webhook. The core is a resilient API client whose every request, retry
//! and failure lands in a leveled SQLite audit log.

// Persistence
pub mod audit;
pub mod config;
pub mod storage;

// Outbound traffic
pub mod bridge;
pub mod client;
pub mod resilience;

// Service runtime
pub mod admin;
pub mod lifecycle;
pub mod mock;
pub mod observability;

pub use audit::{AuditLog, LogEntry, LogLevel, LogQuery};
pub use bridge::{Bridge, OperationResult};
pub use client::{ApiClient, ApiError, ClientOptions};
pub use config::{ApiConfig, ConfigStore, ServiceConfig};
pub use lifecycle::Shutdown;
pub use storage::Storage;
