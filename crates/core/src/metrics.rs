//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Lafzize jobs (submissions, outcomes, in-flight count, duration)
//! - Uploads (transcoding results)

use once_cell::sync::Lazy;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
};

// =============================================================================
// Lafzize Jobs
// =============================================================================

/// Jobs accepted by the coordinator.
pub static LAFZIZE_JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tilawah_lafzize_jobs_submitted_total",
        "Total lafzize jobs accepted",
    )
    .unwrap()
});

/// Jobs finished, by outcome.
pub static LAFZIZE_JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tilawah_lafzize_jobs_finished_total",
            "Total lafzize jobs finished",
        ),
        &["outcome"], // "completed", "upstream", "artifact", "persistence"
    )
    .unwrap()
});

/// Jobs currently running in this process.
pub static LAFZIZE_JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tilawah_lafzize_jobs_in_flight",
        "Lafzize jobs currently running",
    )
    .unwrap()
});

/// Time from submission to terminal outcome.
pub static LAFZIZE_JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tilawah_lafzize_job_duration_seconds",
            "Duration of lafzize jobs",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Files reset by the startup recovery pass.
pub static LAFZIZE_JOBS_RECOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tilawah_lafzize_jobs_recovered_total",
        "Recitation files released by startup recovery",
    )
    .unwrap()
});

// =============================================================================
// Uploads
// =============================================================================

/// Uploads by result.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tilawah_uploads_total", "Total audio uploads"),
        &["result"], // "success", "transcode_failed", "rejected"
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(LAFZIZE_JOBS_SUBMITTED.clone()),
        Box::new(LAFZIZE_JOBS_FINISHED.clone()),
        Box::new(LAFZIZE_JOBS_IN_FLIGHT.clone()),
        Box::new(LAFZIZE_JOB_DURATION.clone()),
        Box::new(LAFZIZE_JOBS_RECOVERED.clone()),
        Box::new(UPLOADS_TOTAL.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        LAFZIZE_JOBS_FINISHED.with_label_values(&["completed"]).inc();
        let names: Vec<_> = registry
            .gather()
            .into_iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"tilawah_lafzize_jobs_finished_total".to_string()));
    }
}
