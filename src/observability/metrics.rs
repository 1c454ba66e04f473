//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): handled connections by outcome
//! - `proxy_cache_lookups_total` (counter): lookups by result (hit/miss)
//! - `proxy_upstream_duration_seconds` (histogram): origin round trip
//! - `proxy_active_connections` (gauge): current connection count
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record how a connection finished.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("proxy_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_upstream(start: Instant) {
    metrics::histogram!("proxy_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_active_connections(count: u64) {
    metrics::gauge!("proxy_active_connections").set(count as f64);
}
