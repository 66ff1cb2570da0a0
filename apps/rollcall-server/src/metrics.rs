//! Prometheus metrics for rollcall-server.
//!
//! Exposes server metrics in Prometheus format at the `/metrics` endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder and return a handle for rendering.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Describe metrics for better documentation in /metrics output
    describe_counter!(
        "rollcall_rpc_requests_total",
        "Total number of RPC requests processed"
    );
    describe_histogram!(
        "rollcall_rpc_request_duration_seconds",
        "Duration of RPC requests in seconds"
    );
    describe_counter!(
        "rollcall_rpc_errors_total",
        "Total number of RPC errors by status code"
    );
    describe_counter!(
        "rollcall_verification_failures_total",
        "Verification outcomes that did not succeed, by kind"
    );

    handle
}

/// Record a successful RPC.
pub fn record_rpc_request(method: &'static str, duration: std::time::Duration) {
    counter!("rollcall_rpc_requests_total", "method" => method, "status" => "ok").increment(1);
    histogram!("rollcall_rpc_request_duration_seconds", "method" => method)
        .record(duration.as_secs_f64());
}

/// Record a failed RPC.
pub fn record_rpc_error(method: &'static str, status_code: &'static str) {
    counter!("rollcall_rpc_requests_total", "method" => method, "status" => "error").increment(1);
    counter!("rollcall_rpc_errors_total", "method" => method, "code" => status_code).increment(1);
}

/// Record a verification outcome that did not succeed (mismatch, expiry, ...).
pub fn record_verification_failure(kind: &'static str) {
    counter!("rollcall_verification_failures_total", "kind" => kind).increment(1);
}

/// A helper to time a request and record metrics on completion.
pub struct RequestTimer {
    method: &'static str,
    start: Instant,
}

impl RequestTimer {
    /// Start timing a request.
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            start: Instant::now(),
        }
    }

    /// Record a successful completion.
    pub fn success(self) {
        record_rpc_request(self.method, self.start.elapsed());
    }

    /// Record a failure with the given status code.
    pub fn error(self, status_code: &'static str) {
        record_rpc_error(self.method, status_code);
    }
}
