// ============================================================================
// Prometheus Metrics - HTTP and import pipeline instrumentation
// ============================================================================
//
// Exposed at GET /metrics in the Prometheus text format.
//
// - sellout_http_request_duration_seconds  histogram {method, path, status}
// - sellout_http_requests_total            counter   {method, path, status}
// - sellout_http_connections_active        gauge
// - sellout_imports_total                  counter   {outcome}
// - sellout_rows_committed_total           counter
//
// ============================================================================

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "sellout_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path", "status"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "sellout_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    ).unwrap();

    pub static ref HTTP_CONNECTIONS_ACTIVE: Gauge = register_gauge!(
        "sellout_http_connections_active",
        "Number of active HTTP connections"
    ).unwrap();

    /// Import commit outcomes: "success" or "error".
    pub static ref IMPORTS_TOTAL: CounterVec = register_counter_vec!(
        "sellout_imports_total",
        "Total number of commit attempts",
        &["outcome"]
    ).unwrap();

    pub static ref ROWS_COMMITTED_TOTAL: Counter = register_counter!(
        "sellout_rows_committed_total",
        "Total number of sales rows appended"
    ).unwrap();
}

/// Collapse path segments that look like IDs so metric cardinality stays
/// bounded (UUIDs and numeric segments become ":id").
fn normalize_path(path: &str) -> String {
    let normalized: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if (segment.len() == 36 && segment.contains('-')) || segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", normalized.join("/"))
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    HTTP_CONNECTIONS_ACTIVE.inc();

    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status_str = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path, &status_str])
        .observe(duration.as_secs_f64());
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, &status_str])
        .inc();
    HTTP_CONNECTIONS_ACTIVE.dec();

    response
}

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

/// Record a commit attempt. Called from the commit handler with the rows
/// actually appended (0 on error).
pub fn record_commit(outcome: &str, rows: usize) {
    IMPORTS_TOTAL.with_label_values(&[outcome]).inc();
    if rows > 0 {
        ROWS_COMMITTED_TOTAL.inc_by(rows as f64);
    }
}
