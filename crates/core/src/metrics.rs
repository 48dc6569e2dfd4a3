//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Stats cache (hits, misses, recompute time)
//! - Location maintenance (bulk migrations)
//! - Search (result sizes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Stats cache
// =============================================================================

/// Stats cache hits by bucket.
pub static STATS_CACHE_HITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gamecubby_stats_cache_hits_total", "Stats reads served from cache"),
        &["bucket"], // "overview", "health", "health_details"
    )
    .unwrap()
});

/// Stats cache misses by bucket.
pub static STATS_CACHE_MISSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gamecubby_stats_cache_misses_total",
            "Stats reads that triggered a recompute",
        ),
        &["bucket"],
    )
    .unwrap()
});

/// Stats recompute duration in seconds.
pub static STATS_RECOMPUTE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "gamecubby_stats_recompute_duration_seconds",
            "Duration of a full stats recompute",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["bucket"],
    )
    .unwrap()
});

// =============================================================================
// Locations
// =============================================================================

/// Games moved by bulk location migrations.
pub static LOCATION_GAMES_MIGRATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gamecubby_location_games_migrated_total",
        "Games repointed by bulk location migrations",
    )
    .unwrap()
});

// =============================================================================
// Search
// =============================================================================

/// Games returned per search.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("gamecubby_search_results", "Number of games returned per search")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 500.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Stats
        Box::new(STATS_CACHE_HITS.clone()),
        Box::new(STATS_CACHE_MISSES.clone()),
        Box::new(STATS_RECOMPUTE_DURATION.clone()),
        // Locations
        Box::new(LOCATION_GAMES_MIGRATED.clone()),
        // Search
        Box::new(SEARCH_RESULTS.clone()),
    ]
}
