//! Collection statistics.
//!
//! Two kinds of numbers come out of here:
//!
//! - **Health**: per-row counters (every physical copy counts) with the
//!   offending row ids behind each counter.
//! - **Overview**: per-title numbers, where copies sharing an external
//!   catalog id fold into one title and manual rows never fold.
//!
//! Both are whole-payload entries in a [`StatsCache`] with a fixed TTL,
//! served through [`StatsAggregator`].

mod aggregate;
mod cache;
mod service;
mod sqlite;
mod types;

pub use aggregate::{compute_health, compute_overview, fold_titles, EntityNames};
pub use cache::{CacheBucket, Cached, Clock, StatsCache, SystemClock};
pub use service::{RefreshReport, StatsAggregator};
pub use types::*;

use std::collections::HashMap;

use crate::catalog::EntityKind;

/// Read side the aggregator recomputes from.
pub trait StatsSource: Send + Sync {
    /// Every game row with the relations stats need, ordered by id.
    fn load_game_rows(&self) -> Result<Vec<GameRow>, StatsError>;

    /// Id to name for every entity of `kind`.
    fn entity_names(&self, kind: EntityKind) -> Result<HashMap<i64, String>, StatsError>;

    /// The default root location, if it exists yet.
    fn default_location(&self) -> Result<Option<i64>, StatsError>;
}
