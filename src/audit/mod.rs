//! Audit log subsystem.
//!
//! # Data Flow
//! ```text
//! add_log_entry(level, event, data)
//!     → LoggerConfig filter (drop below minimum, nothing stored)
//!     → INSERT into `logs` (data as JSON text)
//!     → broadcast to live listeners
//!
//! get_logs(query)
//!     → dynamic WHERE (level AND event AND data LIKE)
//!     → ORDER BY timestamp DESC, paginated
//!     → JSON decode of data, raw text on failure
//! ```
//!
//! # Design Decisions
//! - Entries are immutable; only maintenance purges delete rows
//! - Storage failures are logged to the console and swallowed
//! - The minimum level lives in an explicit `LoggerConfig`, refreshed by the config store

pub mod entry;
pub mod level;
pub mod store;

pub use entry::{LogEntry, LogQuery};
pub use level::LogLevel;
pub use store::{AuditLog, LoggerConfig};
