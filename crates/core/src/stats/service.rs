//! Cached stats service.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::aggregate::{compute_health, compute_overview, EntityNames};
use super::cache::{CacheBucket, Cached, StatsCache};
use super::types::{HealthDetailIds, HealthMetric, HealthStats, MetricDetails, OverviewStats};
use super::{StatsError, StatsSource};
use crate::catalog::EntityKind;
use crate::metrics::STATS_RECOMPUTE_DURATION;

/// Entity kinds whose names appear in the overview rankings.
const RANKED_KINDS: [EntityKind; 3] = [EntityKind::Genre, EntityKind::Platform, EntityKind::Company];

/// Timestamps of a forced recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub overview_computed_at: DateTime<Utc>,
    pub health_computed_at: DateTime<Utc>,
}

/// Serves overview and health stats from a [`StatsCache`], recomputing a
/// bucket from the [`StatsSource`] when it is missing or expired.
///
/// Recomputes of one bucket are serialized; a caller that waited on another
/// caller's recompute reuses its result. A failed recompute propagates and
/// leaves whatever the bucket held before.
pub struct StatsAggregator {
    source: Arc<dyn StatsSource>,
    cache: Arc<StatsCache>,
    overview_lock: Mutex<()>,
    health_lock: Mutex<()>,
}

impl std::fmt::Debug for StatsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsAggregator")
            .field("source", &"<source>")
            .field("cache", &self.cache)
            .finish()
    }
}

fn guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

impl StatsAggregator {
    pub fn new(source: Arc<dyn StatsSource>, cache: Arc<StatsCache>) -> Self {
        Self {
            source,
            cache,
            overview_lock: Mutex::new(()),
            health_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    /// Deduplicated overview, from cache while fresh.
    pub fn overview(&self) -> Result<Cached<OverviewStats>, StatsError> {
        if let Some(cached) = self.cache.get(CacheBucket::Overview) {
            return Ok(cached);
        }

        let _guard = guard(&self.overview_lock);
        if let Some(cached) = self.cache.peek(CacheBucket::Overview) {
            return Ok(cached);
        }
        self.recompute_overview()
    }

    /// Per-row health counters, from cache while fresh.
    pub fn health(&self) -> Result<Cached<HealthStats>, StatsError> {
        if let Some(cached) = self.cache.get(CacheBucket::Health) {
            return Ok(cached);
        }

        let _guard = guard(&self.health_lock);
        if let Some(cached) = self.cache.peek(CacheBucket::Health) {
            return Ok(cached);
        }
        self.recompute_health().map(|(stats, _)| stats)
    }

    /// Offending row ids for one health metric.
    ///
    /// Served from the detail bucket filled alongside the health counters.
    pub fn health_details(&self, metric: HealthMetric) -> Result<MetricDetails, StatsError> {
        let details = match self.cache.get::<HealthDetailIds>(CacheBucket::HealthDetails) {
            Some(details) => details,
            None => {
                let _guard = guard(&self.health_lock);
                match self.cache.peek(CacheBucket::HealthDetails) {
                    Some(details) => details,
                    None => self.recompute_health()?.1,
                }
            }
        };

        let game_ids = details.payload.get(metric).to_vec();
        Ok(MetricDetails {
            metric,
            count: game_ids.len(),
            game_ids,
            computed_at: details.computed_at,
        })
    }

    /// [`health_details`](Self::health_details) for a metric given by name.
    pub fn health_details_by_name(&self, metric: &str) -> Result<MetricDetails, StatsError> {
        self.health_details(metric.parse()?)
    }

    /// Recompute both buckets now, regardless of age.
    pub fn refresh(&self) -> Result<RefreshReport, StatsError> {
        let overview = {
            let _guard = guard(&self.overview_lock);
            self.recompute_overview()?
        };
        let (health, _) = {
            let _guard = guard(&self.health_lock);
            self.recompute_health()?
        };

        info!(
            overview_computed_at = %overview.computed_at,
            health_computed_at = %health.computed_at,
            "Stats refreshed"
        );
        Ok(RefreshReport {
            overview_computed_at: overview.computed_at,
            health_computed_at: health.computed_at,
        })
    }

    fn recompute_overview(&self) -> Result<Cached<OverviewStats>, StatsError> {
        let timer = STATS_RECOMPUTE_DURATION
            .with_label_values(&[CacheBucket::Overview.as_str()])
            .start_timer();

        let rows = self.source.load_game_rows()?;
        let mut names = EntityNames::new();
        for kind in RANKED_KINDS {
            names.insert(kind, self.source.entity_names(kind)?);
        }
        let overview = compute_overview(&rows, &names);

        let elapsed = timer.stop_and_record();
        info!(
            total_games = overview.total_games,
            total_games_unique = overview.total_games_unique,
            elapsed_ms = (elapsed * 1000.0) as u64,
            "Recomputed stats overview"
        );
        Ok(self
            .cache
            .put(CacheBucket::Overview, overview, self.cache.now()))
    }

    fn recompute_health(
        &self,
    ) -> Result<(Cached<HealthStats>, Cached<HealthDetailIds>), StatsError> {
        let timer = STATS_RECOMPUTE_DURATION
            .with_label_values(&[CacheBucket::Health.as_str()])
            .start_timer();

        let rows = self.source.load_game_rows()?;
        let default_location = self.source.default_location()?;
        let (stats, details) = compute_health(&rows, default_location);

        let elapsed = timer.stop_and_record();
        info!(
            total_games = stats.total_games,
            missing_cover = stats.missing_cover,
            no_location = stats.no_location,
            elapsed_ms = (elapsed * 1000.0) as u64,
            "Recomputed stats health"
        );

        let computed_at = self.cache.now();
        let details = self
            .cache
            .put(CacheBucket::HealthDetails, details, computed_at);
        let stats = self.cache.put(CacheBucket::Health, stats, computed_at);
        Ok((stats, details))
    }
}
