//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mvc_requests_total` (counter): requests by method, status, outcome
//! - `mvc_request_duration_seconds` (histogram): end-to-end latency
//! - `mvc_guard_rejections_total` (counter): failed guard checks by guard
//!
//! # Design Decisions
//! - The Prometheus exporter is opt-in (`observability.metrics_enabled`)
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("mvc_requests_total", "Requests handled, by method, status and outcome");
    describe_histogram!("mvc_request_duration_seconds", "Time spent handling a request");
    describe_counter!("mvc_guard_rejections_total", "Requests stopped by a route guard");

    tracing::info!(address = %addr, "Prometheus metrics available at /metrics");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "mvc_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("mvc_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_guard_rejection(guard: &str) {
    metrics::counter!("mvc_guard_rejections_total", "guard" => guard.to_string()).increment(1);
}
