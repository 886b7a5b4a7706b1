// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

// Macros for metrics when observability is disabled
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

// Re-export macros for use in this module when observability is disabled
#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Initializes the descriptions for all the metrics in the application.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "adapter_outcomes_total",
        Unit::Count,
        "Adapter resolution outcomes, labeled by source and outcome (found, not_found, timeout)."
    );
    describe_counter!(
        "resolutions_total",
        Unit::Count,
        "Total resolution passes, labeled by result (resolved, placeholder)."
    );
    describe_counter!(
        "resolution_dedup_hits_total",
        Unit::Count,
        "Resolutions that joined an already in-flight pass for the same identifier."
    );
    describe_histogram!(
        "resolution_duration_ms",
        "End-to-end resolve() latency in milliseconds."
    );
    describe_counter!("cache_hits_total", Unit::Count, "Cache hits, labeled by cache.");
    describe_counter!("cache_miss_total", Unit::Count, "Cache misses, labeled by cache.");
    describe_gauge!("cache_size_gauge", "Cache entry counts, labeled by cache.");
    describe_counter!(
        "catalog_enrichment_skips_total",
        Unit::Count,
        "Tokens skipped during catalog batch enrichment."
    );
    describe_gauge!("catalog_size_gauge", "Size of the enriched token catalog.");
}

pub fn increment_adapter_outcome(source: &str, outcome: &str) {
    counter!("adapter_outcomes_total", 1, "source" => source.to_string(), "outcome" => outcome.to_string());
}

pub fn increment_resolution(result: &str) {
    counter!("resolutions_total", 1, "result" => result.to_string());
}

pub fn increment_dedup_hit() {
    counter!("resolution_dedup_hits_total", 1);
}

pub fn record_resolution_duration_ms(ms: f64) {
    histogram!("resolution_duration_ms", ms);
}

pub fn increment_cache_hit(cache_name: &str) {
    counter!("cache_hits_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_cache_miss(cache_name: &str) {
    counter!("cache_miss_total", 1, "cache" => cache_name.to_string());
}

pub fn set_cache_size(cache_name: &str, size: f64) {
    gauge!("cache_size_gauge", size, "cache" => cache_name.to_string());
}

pub fn increment_enrichment_skips(count: u64) {
    counter!("catalog_enrichment_skips_total", count);
}

pub fn set_catalog_size(size: f64) {
    gauge!("catalog_size_gauge", size);
}
