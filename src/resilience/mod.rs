//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → client enforces the configured timeout on every attempt
//!     → On failure: retries.rs (classify, check budget)
//!     → backoff.rs (linear delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry delays are plain `tokio::time::sleep` calls

pub mod backoff;
pub mod retries;

pub use retries::{classify_status, FailureClass, RetryPolicy};
