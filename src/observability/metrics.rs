//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_api_requests_total` (counter): outbound requests by method, final status
//! - `bridge_api_request_duration_seconds` (histogram): end-to-end latency including retries
//! - `bridge_api_retries_total` (counter): retry attempts by method
//! - `bridge_audit_entries_total` (counter): stored audit entries by level
//! - `bridge_audit_dropped_total` (counter): entries filtered out by the minimum level

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::audit::LogLevel;

/// Install the Prometheus exporter on `addr`. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished outbound request. `status` is 0 when no response was received.
pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "bridge_api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("bridge_api_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(method: &str) {
    ::metrics::counter!("bridge_api_retries_total", "method" => method.to_string()).increment(1);
}

pub fn record_audit_entry(level: LogLevel) {
    ::metrics::counter!("bridge_audit_entries_total", "level" => level.as_str()).increment(1);
}

pub fn record_audit_dropped() {
    ::metrics::counter!("bridge_audit_dropped_total").increment(1);
}
