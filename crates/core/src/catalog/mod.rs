//! Game catalog - the entity graph every other module reads through.
//!
//! Games reference one storage location and any number of facet targets
//! (platforms, genres, tags, ...). The SQLite implementation also backs the
//! location, search and stats stores.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub(crate) use sqlite::{fetch_game, row_exists, row_to_game, GAME_COLUMNS};
pub use types::*;
pub(crate) use types::db_err;

/// CRUD over games and their standalone facet entities.
pub trait GameCatalog: Send + Sync {
    /// Create a game and its relation rows.
    ///
    /// Unknown facet ids are skipped. A missing or zero location places the
    /// game in the default location, creating it on first use.
    fn create_game(&self, game: &NewGame) -> Result<GameDetail, CatalogError>;

    /// Apply a partial update.
    ///
    /// Games imported from the external catalog only accept placement
    /// changes (location and display order).
    fn update_game(&self, id: i64, update: &GameUpdate) -> Result<GameDetail, CatalogError>;

    /// Get a game with its relations and location path.
    fn get_game(&self, id: i64) -> Result<GameDetail, CatalogError>;

    /// Delete a game. Relation rows go with it.
    fn delete_game(&self, id: i64) -> Result<(), CatalogError>;

    /// Create a facet entity, collection or company. Returns the existing
    /// row when the name is already taken.
    fn create_entity(&self, kind: EntityKind, name: &str) -> Result<NamedEntity, CatalogError>;

    /// List all entities of a kind, ordered case-insensitively by name.
    fn list_entities(&self, kind: EntityKind) -> Result<Vec<NamedEntity>, CatalogError>;
}
