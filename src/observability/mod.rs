//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured console events, fallback for audit failures)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! The durable, user-facing record is the audit log (`crate::audit`); this
//! module only covers operator-facing signals.

pub mod logging;
pub mod metrics;
