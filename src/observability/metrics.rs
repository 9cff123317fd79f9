//! Metrics collection and exposition.
//!
//! # Metrics
//! - `yalb_requests_total` (counter): requests by method, status, backend
//! - `yalb_request_duration_seconds` (histogram): latency distribution
//! - `yalb_active_connections` (gauge): in-flight requests per backend
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        "yalb_requests_total",
        "method" => method.to_string(),
        "status" => status,
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!(
        "yalb_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Publish the current in-flight count of a backend.
pub fn record_active_connections(backend: &str, count: usize) {
    gauge!("yalb_active_connections", "backend" => backend.to_string()).set(count as f64);
}
