//! Metrics helpers
//!
//! Records counters and latency histograms for the engine's operations
//! through the `metrics` facade; the embedding binary decides where they
//! are exported.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

/// Metrics prefix for all paperdex metrics
pub const METRICS_PREFIX: &str = "paperdex";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search requests by mode"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search latency in seconds"
    );

    describe_counter!(
        format!("{}_documents_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of documents indexed"
    );

    describe_histogram!(
        format!("{}_indexed_chunks", METRICS_PREFIX),
        Unit::Count,
        "Chunks persisted per indexing run"
    );

    describe_counter!(
        format!("{}_citations_matched_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of citations matched against the corpus"
    );
}

/// Record one search request
pub fn record_search(mode: &'static str, duration: Duration, result_count: usize) {
    counter!(format!("{}_searches_total", METRICS_PREFIX), "mode" => mode).increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX), "mode" => mode)
        .record(duration.as_secs_f64());
    histogram!(format!("{}_search_results", METRICS_PREFIX), "mode" => mode)
        .record(result_count as f64);
}

/// Record one completed indexing run
pub fn record_indexing(chunk_count: usize, duration: Duration) {
    counter!(format!("{}_documents_indexed_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_indexed_chunks", METRICS_PREFIX)).record(chunk_count as f64);
    histogram!(format!("{}_indexing_duration_seconds", METRICS_PREFIX))
        .record(duration.as_secs_f64());
}

/// Record one citation-matching batch
pub fn record_citation_batch(matched: usize, duration: Duration) {
    counter!(format!("{}_citations_matched_total", METRICS_PREFIX)).increment(matched as u64);
    histogram!(format!("{}_citation_match_duration_seconds", METRICS_PREFIX))
        .record(duration.as_secs_f64());
}
