//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! service file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable for the process lifetime)
//!
//! config table (SQLite)
//!     → store.rs (string get/set/delete)
//!     → validation.rs (typed checks, default substitution)
//!     → ApiConfig (rebuilt on every read)
//! ```
//!
//! # Design Decisions
//! - The service file is read once; API settings are re-read per operation
//!   so edits made through the admin API apply without a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AdminConfig, ApiConfig, LoopConfig, ObservabilityConfig, ServiceConfig, StorageConfig,
};
pub use store::{ConfigEntry, ConfigStore};
