//! # Metrics Collection
//!
//! Prometheus exporter for the counters emitted by the gateway and the
//! request middleware.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::core::error::{ProxyError, ProxyResult};

/// Histogram buckets for request latency, in seconds
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> ProxyResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| ProxyError::internal(format!("Failed to set histogram buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| ProxyError::internal(format!("Failed to install metrics recorder: {}", e)))?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!("cache_requests_total", "Catalog requests by resource family and cache outcome");
    describe_counter!("cache_errors_total", "Cache store failures absorbed by the gateway");
    describe_counter!("upstream_failures_total", "Upstream fetches that produced no payload");
    describe_counter!("rate_limited_requests_total", "Requests rejected by the rate limiter");
    describe_counter!("http_requests_total", "HTTP requests by method and status");
    describe_histogram!("http_request_duration_seconds", "HTTP request latency");
}
