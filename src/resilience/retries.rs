//! Retry logic.
//!
//! # Responsibilities
//! - Classify a failed attempt as transient or terminal
//! - Decide whether another attempt is allowed and how long to wait
//!
//! # Design Decisions
//! - Connection, DNS, timeout and body-read errors are always transient
//! - 5xx is transient; every other non-2xx status is terminal
//! - The method does not matter: POST is retried like GET

use std::time::Duration;

use crate::resilience::backoff::calculate_backoff;

/// Failure class of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying.
    Transient,
    /// Surface immediately.
    Terminal,
}

/// Classify an HTTP status. `None` means the attempt succeeded.
pub fn classify_status(status: u16) -> Option<FailureClass> {
    match status {
        200..=299 => None,
        500.. => Some(FailureClass::Transient),
        _ => Some(FailureClass::Terminal),
    }
}

/// Bounded retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the original attempt.
    pub max_retries: u32,
    /// Linear backoff factor.
    pub delay_factor: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay_factor: Duration) -> Self {
        Self { max_retries, delay_factor }
    }

    /// Whether retry number `attempt` (1-based) may run after a failure of `class`.
    pub fn should_retry(&self, attempt: u32, class: FailureClass) -> bool {
        class == FailureClass::Transient && attempt <= self.max_retries
    }

    /// Delay before retry number `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.delay_factor)
    }
}
