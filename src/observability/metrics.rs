//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route and status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_health_probes_total` (counter): probes by route and result
//! - `gateway_backend_up` (gauge): 1=healthy, 0=unhealthy, by route
//!
//! Recording is a no-op until [`init_metrics`] installs an exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(route: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record the outcome of a health probe.
pub fn record_probe(route: &str, healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    metrics::counter!(
        "gateway_health_probes_total",
        "route" => route.to_string(),
        "result" => result
    )
    .increment(1);
    metrics::gauge!("gateway_backend_up", "route" => route.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
