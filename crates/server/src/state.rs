use std::sync::Arc;

use gamecubby_core::{
    stats::StatsCache, Authenticator, Config, SanitizedConfig, SqliteCatalog, StatsAggregator,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    catalog: Arc<SqliteCatalog>,
    stats: StatsAggregator,
}

impl AppState {
    /// Wire the stats aggregator to the catalog with the configured TTL.
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        catalog: Arc<SqliteCatalog>,
    ) -> Self {
        let ttl = chrono::Duration::seconds(config.stats.cache_ttl_secs as i64);
        Self::with_stats_cache(config, authenticator, catalog, Arc::new(StatsCache::new(ttl)))
    }

    /// Like [`new`](Self::new) with a caller-supplied cache (tests drive its clock).
    pub fn with_stats_cache(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        catalog: Arc<SqliteCatalog>,
        cache: Arc<StatsCache>,
    ) -> Self {
        let stats = StatsAggregator::new(catalog.clone(), cache);
        Self {
            config,
            authenticator,
            catalog,
            stats,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn catalog(&self) -> &SqliteCatalog {
        self.catalog.as_ref()
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }
}
