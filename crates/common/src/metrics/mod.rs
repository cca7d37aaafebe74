//! Metrics and observability utilities
//!
//! Metric descriptions and recording helpers for the upload pipeline.
//! The `metrics` facade is a no-op until a recorder is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all DevAssist metrics
pub const METRICS_PREFIX: &str = "devassist";

/// Buckets for per-file extraction latency (in seconds)
pub const EXTRACTION_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_upload_batches_total", METRICS_PREFIX),
        Unit::Count,
        "Upload batches by category and outcome"
    );

    describe_counter!(
        format!("{}_files_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Files rejected before extraction"
    );

    describe_counter!(
        format!("{}_extractions_total", METRICS_PREFIX),
        Unit::Count,
        "Text extractions by status"
    );

    describe_histogram!(
        format!("{}_extraction_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-file text extraction latency in seconds"
    );

    describe_gauge!(
        format!("{}_session_files", METRICS_PREFIX),
        Unit::Count,
        "Files currently held by the session per category"
    );

    tracing::debug!("Metrics registered");
}

/// Record the outcome of one upload batch
pub fn record_batch(category: &str, outcome: &str, files: usize) {
    counter!(
        format!("{}_upload_batches_total", METRICS_PREFIX),
        "category" => category.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    if outcome != "accepted" {
        counter!(
            format!("{}_files_rejected_total", METRICS_PREFIX),
            "category" => category.to_string(),
            "reason" => outcome.to_string()
        )
        .increment(files as u64);
    }
}

/// Record a single extraction
pub fn record_extraction(duration_secs: f64, extractor: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_extractions_total", METRICS_PREFIX),
        "extractor" => extractor.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_extraction_duration_seconds", METRICS_PREFIX),
        "extractor" => extractor.to_string()
    )
    .record(duration_secs);
}

/// Record the number of files a session holds for a category
pub fn record_session_size(category: &str, files: usize) {
    gauge!(
        format!("{}_session_files", METRICS_PREFIX),
        "category" => category.to_string()
    )
    .set(files as f64);
}
