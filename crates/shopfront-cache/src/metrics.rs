//! Prometheus-style metrics for cache effectiveness and health.
//!
//! Every series carries a `backend` label with the configured backend name.

use ::metrics::{counter, describe_counter};

/// Metric names for the cache layer.
pub mod names {
    /// Reads served from the cache.
    pub const CACHE_HITS_TOTAL: &str = "shopfront_cache_hits_total";
    /// Reads that fell through to the system of record.
    pub const CACHE_MISSES_TOTAL: &str = "shopfront_cache_misses_total";
    /// Entries written.
    pub const CACHE_WRITES_TOTAL: &str = "shopfront_cache_writes_total";
    /// Entries removed by key, pattern, or clear.
    pub const CACHE_REMOVALS_TOTAL: &str = "shopfront_cache_removals_total";
    /// Backend failures swallowed by the service.
    pub const CACHE_ERRORS_TOTAL: &str = "shopfront_cache_errors_total";
    /// Stored payloads that failed to deserialize.
    pub const CACHE_CORRUPT_ENTRIES_TOTAL: &str = "shopfront_cache_corrupt_entries_total";
    /// Loader invocations from `get_or_set`.
    pub const CACHE_LOADS_TOTAL: &str = "shopfront_cache_loads_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(names::CACHE_WRITES_TOTAL, "Total number of cache writes");
    describe_counter!(
        names::CACHE_REMOVALS_TOTAL,
        "Total number of cache entries removed"
    );
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of cache backend failures degraded to a safe default"
    );
    describe_counter!(
        names::CACHE_CORRUPT_ENTRIES_TOTAL,
        "Total number of cached payloads that could not be deserialized"
    );
    describe_counter!(
        names::CACHE_LOADS_TOTAL,
        "Total number of loader invocations on cache miss"
    );
}

pub(crate) fn record_hit(backend: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "backend" => backend).increment(1);
}

pub(crate) fn record_miss(backend: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "backend" => backend).increment(1);
}

pub(crate) fn record_write(backend: &'static str) {
    counter!(names::CACHE_WRITES_TOTAL, "backend" => backend).increment(1);
}

pub(crate) fn record_removals(backend: &'static str, count: u64) {
    if count > 0 {
        counter!(names::CACHE_REMOVALS_TOTAL, "backend" => backend).increment(count);
    }
}

pub(crate) fn record_error(backend: &'static str, operation: &'static str) {
    counter!(
        names::CACHE_ERRORS_TOTAL,
        "backend" => backend,
        "operation" => operation
    )
    .increment(1);
}

pub(crate) fn record_corrupt_entry(backend: &'static str) {
    counter!(names::CACHE_CORRUPT_ENTRIES_TOTAL, "backend" => backend).increment(1);
}

pub(crate) fn record_load(backend: &'static str) {
    counter!(names::CACHE_LOADS_TOTAL, "backend" => backend).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        register_metrics();
    }

    #[test]
    fn test_recording_without_recorder() {
        record_hit("in_memory");
        record_miss("in_memory");
        record_write("redis");
        record_removals("redis", 0);
        record_removals("redis", 3);
        record_error("redis", "get");
        record_corrupt_entry("in_memory");
        record_load("none");
    }
}
