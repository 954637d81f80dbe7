//! Translation metrics and observability module.
//!
//! Counters for cache hits and misses, catalog lookups, files dropped
//! after a decode error, and locale partitions pruned from the cache.
//! Each controller owns its own instance so independent registries never
//! share counts.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Translation counters owned by a controller.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Number of times a translation was served from the cache
    cache_hits: AtomicUsize,

    /// Number of times the cache had to ask the controller
    cache_misses: AtomicUsize,

    /// Number of catalog searches performed by the controller
    catalog_lookups: AtomicUsize,

    /// Number of files unloaded because they reported an error
    files_dropped: AtomicUsize,

    /// Number of locale partitions pruned from the cache
    locales_pruned: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit (translation found in cache).
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss (translation not found in cache).
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a search through the loaded catalogs.
    pub fn record_catalog_lookup(&self) {
        self.catalog_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file unloaded after a decode error.
    pub fn record_file_dropped(&self) {
        self.files_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a locale partition pruned from the cache.
    pub fn record_locale_pruned(&self) {
        self.locales_pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn catalog_lookups(&self) -> usize {
        self.catalog_lookups.load(Ordering::Relaxed)
    }

    pub fn files_dropped(&self) -> usize {
        self.files_dropped.load(Ordering::Relaxed)
    }

    pub fn locales_pruned(&self) -> usize {
        self.locales_pruned.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_cache_queries = hits + misses;
        let cache_hit_rate = if total_cache_queries > 0 {
            (hits as f64 / total_cache_queries as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            catalog_lookups: self.catalog_lookups(),
            files_dropped: self.files_dropped(),
            locales_pruned: self.locales_pruned(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.catalog_lookups.store(0, Ordering::Relaxed);
        self.files_dropped.store(0, Ordering::Relaxed);
        self.locales_pruned.store(0, Ordering::Relaxed);
    }
}

/// Metrics report containing current translation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Number of cache hits
    pub cache_hits: usize,

    /// Number of cache misses
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    /// Number of catalog searches
    pub catalog_lookups: usize,

    /// Number of files dropped after an error
    pub files_dropped: usize,

    /// Number of locale partitions pruned
    pub locales_pruned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Counter Tests ====================

    #[test]
    fn test_record_cache_hit() {
        let metrics = TranslationMetrics::new();

        assert_eq!(metrics.cache_hits(), 0);
        metrics.record_cache_hit();
        assert_eq!(metrics.cache_hits(), 1);
        metrics.record_cache_hit();
        assert_eq!(metrics.cache_hits(), 2);
    }

    #[test]
    fn test_record_counters() {
        let metrics = TranslationMetrics::new();

        metrics.record_cache_miss();
        metrics.record_catalog_lookup();
        metrics.record_catalog_lookup();
        metrics.record_file_dropped();
        metrics.record_locale_pruned();

        assert_eq!(metrics.cache_misses(), 1);
        assert_eq!(metrics.catalog_lookups(), 2);
        assert_eq!(metrics.files_dropped(), 1);
        assert_eq!(metrics.locales_pruned(), 1);
    }

    #[test]
    fn test_instances_are_independent() {
        let first = TranslationMetrics::new();
        let second = TranslationMetrics::new();

        first.record_cache_hit();
        assert_eq!(first.cache_hits(), 1);
        assert_eq!(second.cache_hits(), 0);
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_report_empty() {
        let report = TranslationMetrics::new().report();

        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.cache_misses, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert_eq!(report.catalog_lookups, 0);
    }

    #[test]
    fn test_report_cache_hit_rate() {
        let metrics = TranslationMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let report = metrics.report();
        assert_eq!(report.cache_hits, 3);
        assert_eq!(report.cache_misses, 1);
        assert_eq!(report.cache_hit_rate, 75.0);
    }

    #[test]
    fn test_reset() {
        let metrics = TranslationMetrics::new();
        metrics.record_cache_hit();
        metrics.record_catalog_lookup();
        metrics.reset();

        assert_eq!(metrics.cache_hits(), 0);
        assert_eq!(metrics.catalog_lookups(), 0);
    }

    #[test]
    fn test_report_serializes() {
        let metrics = TranslationMetrics::new();
        metrics.record_cache_miss();

        let json = serde_json::to_string(&metrics.report()).expect("Should serialize");
        assert!(json.contains("\"cache_misses\":1"));
        assert!(json.contains("cache_hit_rate"));
    }
}
