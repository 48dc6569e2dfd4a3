//! Testing utilities: a hand-driven clock, an in-memory stats source and
//! catalog fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use gamecubby_core::testing::{fixtures, ManualClock, StaticStatsSource};
//!
//! let catalog = fixtures::catalog();
//! let shelf = fixtures::location(&catalog, "Shelf", None);
//! let id = fixtures::add_game(&catalog, fixtures::manual_game("Homebrew").at(shelf));
//! ```

mod manual_clock;
mod mock_stats_source;

pub use manual_clock::ManualClock;
pub use mock_stats_source::StaticStatsSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{EntityKind, GameCatalog, NewGame, SqliteCatalog};
    use crate::location::LocationStore;
    use crate::stats::GameRow;

    /// Fresh in-memory catalog with the schema in place.
    pub fn catalog() -> SqliteCatalog {
        SqliteCatalog::in_memory().expect("in-memory catalog")
    }

    /// Create a location and return its id.
    pub fn location(catalog: &SqliteCatalog, name: &str, parent_id: Option<i64>) -> i64 {
        catalog
            .create_location(name, parent_id, None)
            .expect("create location")
            .id
    }

    /// Create (or fetch) a named entity and return its id.
    pub fn entity(catalog: &SqliteCatalog, kind: EntityKind, name: &str) -> i64 {
        catalog.create_entity(kind, name).expect("create entity").id
    }

    /// A manual entry with no relations.
    pub fn manual_game(name: &str) -> NewGame {
        NewGame::named(name)
    }

    /// A catalog-sourced entry with a cover and a release year.
    pub fn imported_game(name: &str, igdb_id: i64) -> NewGame {
        NewGame {
            igdb_id: Some(igdb_id),
            cover_url: Some(format!("https://images.igdb.com/{igdb_id}.jpg")),
            release_year: Some(2000),
            ..NewGame::named(name)
        }
    }

    /// Insert a game and return its row id.
    pub fn add_game(catalog: &SqliteCatalog, game: NewGame) -> i64 {
        catalog.create_game(&game).expect("create game").game.id
    }

    /// A stats row with no health issues.
    pub fn game_row(id: i64, igdb_id: i64, name: &str) -> GameRow {
        GameRow {
            id,
            igdb_id,
            name: name.to_string(),
            release_year: Some(2000),
            cover_url: Some(format!("https://images.igdb.com/{id}.jpg")),
            location_id: Some(1),
            platform_ids: vec![1],
            tag_count: 1,
            ..Default::default()
        }
    }

    /// Builder-style helpers on [`NewGame`] for seeding.
    pub trait NewGameExt {
        fn at(self, location_id: i64) -> Self;
        fn with_facet(self, kind: EntityKind, ids: &[i64]) -> Self;
    }

    impl NewGameExt for NewGame {
        fn at(mut self, location_id: i64) -> Self {
            self.location_id = Some(location_id);
            self
        }

        fn with_facet(mut self, kind: EntityKind, ids: &[i64]) -> Self {
            let target = match kind {
                EntityKind::Platform => &mut self.platform_ids,
                EntityKind::Genre => &mut self.genre_ids,
                EntityKind::Mode => &mut self.mode_ids,
                EntityKind::Perspective => &mut self.perspective_ids,
                EntityKind::Tag => &mut self.tag_ids,
                EntityKind::IgdbTag => &mut self.igdb_tag_ids,
                EntityKind::Collection => {
                    self.collection_id = ids.first().copied();
                    return self;
                }
                EntityKind::Company => {
                    self.companies
                        .extend(ids.iter().map(|&company_id| crate::catalog::CompanyRoleInput {
                            company_id,
                            roles: crate::catalog::CompanyRoles {
                                developer: true,
                                ..Default::default()
                            },
                        }));
                    return self;
                }
            };
            target.extend_from_slice(ids);
            self
        }
    }
}
