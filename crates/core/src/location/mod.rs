//! Location hierarchy - storage locations arranged as a forest.
//!
//! Paths and descendant sets are computed from a one-read snapshot
//! ([`LocationTree`]) rather than one query per tree level.

mod sqlite;
mod tree;

pub(crate) use sqlite::{
    descendant_ids_in, ensure_default_location_in, find_default_location_in, load_tree_in,
    location_path_in,
};
pub use tree::LocationTree;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, Location, LocationPathEntry, NamedEntity};

/// Result of a guarded location delete.
///
/// Blocked deletes are ordinary outcomes, not errors, so callers can tell
/// the three causes apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    HasChildren { children: i64 },
    HasGames { games: i64 },
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted)
    }

    /// Human-readable reason a delete did not happen.
    pub fn reason(&self) -> Option<String> {
        match self {
            DeleteOutcome::Deleted => None,
            DeleteOutcome::NotFound => Some("Location not found".to_string()),
            DeleteOutcome::HasChildren { children } => Some(format!(
                "Location has {children} child location(s); delete or move them first"
            )),
            DeleteOutcome::HasGames { games } => Some(format!(
                "Location holds {games} game(s); migrate them first"
            )),
        }
    }
}

/// Errors for location operations.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location not found: {0}")]
    NotFound(i64),

    #[error("Parent location not found: {0}")]
    ParentNotFound(i64),

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Location name must not be empty")]
    EmptyName,

    #[error("Source and target location are the same")]
    SameLocation,

    #[error("Target location not found: {0}")]
    TargetNotFound(i64),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Storage-location operations.
pub trait LocationStore: Send + Sync {
    /// Create a location, optionally under an existing parent.
    fn create_location(
        &self,
        name: &str,
        parent_id: Option<i64>,
        kind: Option<&str>,
    ) -> Result<Location, LocationError>;

    fn get_location(&self, id: i64) -> Result<Location, LocationError>;

    /// All locations, ordered by name.
    fn list_locations(&self) -> Result<Vec<Location>, LocationError>;

    /// Root locations (no parent), ordered by name.
    fn list_top_locations(&self) -> Result<Vec<Location>, LocationError>;

    /// Direct children of a location, ordered by name.
    fn list_children(&self, parent_id: i64) -> Result<Vec<Location>, LocationError>;

    /// Root-first path ending at `id`.
    fn location_path(&self, id: i64) -> Result<Vec<LocationPathEntry>, LocationError>;

    /// Root-first path of a game's location. Empty if the game has none.
    fn game_location_path(&self, game_id: i64) -> Result<Vec<LocationPathEntry>, LocationError>;

    /// Every location beneath `root_id`, excluding the root itself.
    fn descendant_ids(&self, root_id: i64) -> Result<Vec<i64>, LocationError>;

    /// Delete a childless location that holds no games.
    fn delete_location(&self, id: i64) -> Result<DeleteOutcome, LocationError>;

    fn rename_location(&self, id: i64, name: &str) -> Result<Location, LocationError>;

    /// Repoint every game at `from_id` to `to_id`. Returns the number moved.
    fn migrate_games(&self, from_id: i64, to_id: i64) -> Result<usize, LocationError>;

    /// Id of the default root location, if it has been created.
    fn default_location_id(&self) -> Result<Option<i64>, LocationError>;

    /// Id of the default root location, creating it when missing.
    fn ensure_default_location(&self) -> Result<i64, LocationError>;

    /// Games stored directly at a location, ordered by name.
    fn list_games_at(&self, location_id: i64) -> Result<Vec<NamedEntity>, LocationError>;
}
