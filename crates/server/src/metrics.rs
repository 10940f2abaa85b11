//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Tilawah server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Authentication failures
//! - Core metrics (lafzize jobs, uploads), registered from `tilawah_core`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tilawah_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tilawah_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tilawah_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tilawah_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Core metrics (lafzize jobs, uploads)
    for metric in tilawah_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

static VERSE_KEY_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d{1,3}:\d{1,3}(/|$)").unwrap());

/// Normalize a path for metric labels.
///
/// Usernames and slugs are unbounded, so every path segment after the
/// resource name is replaced by a placeholder. Verse keys get their own.
pub fn normalize_path(path: &str) -> String {
    let path = VERSE_KEY_SEGMENT.replace_all(path, "/{verse_key}$1");

    let Some(rest) = path.strip_prefix("/api/v1/") else {
        if path.starts_with("/uploads/") {
            return "/uploads/{file}".to_string();
        }
        return path.to_string();
    };

    let mut segments = rest.split('/');
    let resource = segments.next().unwrap_or_default();
    let mut normalized = format!("/api/v1/{}", resource);
    for segment in segments {
        normalized.push('/');
        if segment == "{verse_key}" {
            normalized.push_str(segment);
        } else {
            normalized.push_str("{id}");
        }
    }
    normalized
}
