//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, retries, client churn)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_retries_total` (counter): retries by service and failure kind
//! - `gateway_resolution_failures_total` (counter): resolver errors by service
//! - `gateway_client_builds_total` (counter): backend clients created
//! - `gateway_client_evictions_total` (counter): backend clients discarded
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are low-cardinality: route name, service URI, status, kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed inbound request.
pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one retry of a backend call.
pub fn record_retry(service: &str, kind: &'static str) {
    metrics::counter!(
        "gateway_retries_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_resolution_failure(service: &str) {
    metrics::counter!(
        "gateway_resolution_failures_total",
        "service" => service.to_string()
    )
    .increment(1);
}

pub fn record_client_build() {
    metrics::counter!("gateway_client_builds_total").increment(1);
}

pub fn record_client_eviction() {
    metrics::counter!("gateway_client_evictions_total").increment(1);
}
