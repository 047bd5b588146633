//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! - `request` - path, method, status, latency
//! - `handshake` - decision status tag and code per handshake

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Metrics middleware that records request counts and latency.
///
/// Uses tracing events on the metrics target; log-based aggregation turns
/// them into counters and histograms.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "handshake_gateway::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record the outcome of one handshake.
pub fn record_handshake(status_tag: &str, status_code: u16) {
    info!(
        target: "handshake_gateway::metrics",
        metric_type = "handshake",
        status_tag = status_tag,
        status_code = status_code,
        "handshake_metric"
    );
}
