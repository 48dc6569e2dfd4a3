//! End-to-end catalog scenarios against an on-disk database.
//!
//! These tests drive the public API the way the HTTP layer does:
//! - Faceted search over platforms in any/all/exact mode
//! - Location paths, descendants, guarded delete and bulk migration
//! - Cached health and overview stats over the same catalog

use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;

use gamecubby_core::{
    catalog::{EntityKind, FacetKind, GameCatalog, GameUpdate, SqliteCatalog},
    location::{DeleteOutcome, LocationError, LocationStore},
    search::{FacetFilter, GameFilter, GameSearch},
    stats::{HealthMetric, StatsAggregator, StatsCache},
    testing::{
        fixtures::{self, NewGameExt},
        ManualClock,
    },
};

struct TestHarness {
    catalog: Arc<SqliteCatalog>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let catalog = SqliteCatalog::new(&temp_dir.path().join("catalog.db"))
            .expect("Failed to open catalog");
        Self {
            catalog: Arc::new(catalog),
            _temp_dir: temp_dir,
        }
    }

    fn stats(&self, ttl_secs: i64) -> (StatsAggregator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(StatsCache::with_clock(
            Duration::seconds(ttl_secs),
            clock.clone(),
        ));
        let stats = StatsAggregator::new(self.catalog.clone(), cache);
        (stats, clock)
    }
}

fn ids(games: Vec<gamecubby_core::Game>) -> Vec<i64> {
    games.into_iter().map(|g| g.id).collect()
}

#[test]
fn test_platform_match_modes() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let p1 = fixtures::entity(c, EntityKind::Platform, "Game Boy");
    let p2 = fixtures::entity(c, EntityKind::Platform, "Game Boy Color");
    let p3 = fixtures::entity(c, EntityKind::Platform, "Game Boy Advance");

    let a = fixtures::add_game(
        c,
        fixtures::manual_game("A").with_facet(EntityKind::Platform, &[p1, p2]),
    );
    let b = fixtures::add_game(
        c,
        fixtures::manual_game("B").with_facet(EntityKind::Platform, &[p1]),
    );
    let cc = fixtures::add_game(
        c,
        fixtures::manual_game("C").with_facet(EntityKind::Platform, &[p2, p3]),
    );

    let search = |filter: FacetFilter| {
        ids(c
            .search_games(&GameFilter::new().facet(FacetKind::Platform, filter))
            .unwrap())
    };
    assert_eq!(search(FacetFilter::any([p1, p2])), vec![a, b, cc]);
    assert_eq!(search(FacetFilter::all([p1, p2])), vec![a]);
    assert_eq!(search(FacetFilter::exact([p1, p2])), vec![a]);
}

#[test]
fn test_search_from_raw_params() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let rpg = fixtures::entity(c, EntityKind::Genre, "RPG");
    let zelda = fixtures::add_game(
        c,
        fixtures::imported_game("The Legend of Zelda", 1025).with_facet(EntityKind::Genre, &[rpg]),
    );
    fixtures::add_game(c, fixtures::manual_game("Zelda fan game"));

    let raw = vec![
        ("name".to_string(), "zelda".to_string()),
        ("genre_ids".to_string(), rpg.to_string()),
        ("include_manual".to_string(), "false".to_string()),
    ];
    let filter = GameFilter::from_params(&raw).unwrap();
    assert_eq!(ids(c.search_games(&filter).unwrap()), vec![zelda]);
}

#[test]
fn test_location_path_and_descendants() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let root = fixtures::location(c, "Root", None);
    let shelf = fixtures::location(c, "Shelf", Some(root));
    let boxed = fixtures::location(c, "Box", Some(shelf));
    let game = fixtures::add_game(c, fixtures::manual_game("Metroid").at(boxed));

    let path: Vec<(i64, String)> = c
        .game_location_path(game)
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();
    assert_eq!(
        path,
        vec![
            (root, "Root".to_string()),
            (shelf, "Shelf".to_string()),
            (boxed, "Box".to_string()),
        ]
    );

    let mut descendants = c.descendant_ids(root).unwrap();
    descendants.sort_unstable();
    assert_eq!(descendants, vec![shelf, boxed]);

    // The search result carries the same path
    let found = c
        .search_games(&GameFilter::new().location(root, true))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location_path.len(), 3);
}

#[test]
fn test_delete_guard_then_delete_bottom_up() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let root = fixtures::location(c, "Root", None);
    let shelf = fixtures::location(c, "Shelf", Some(root));
    let boxed = fixtures::location(c, "Box", Some(shelf));

    let outcome = c.delete_location(shelf).unwrap();
    assert_eq!(outcome, DeleteOutcome::HasChildren { children: 1 });
    assert!(!outcome.is_deleted());

    assert_eq!(c.delete_location(boxed).unwrap(), DeleteOutcome::Deleted);
    assert_eq!(c.delete_location(shelf).unwrap(), DeleteOutcome::Deleted);
    assert_eq!(c.delete_location(shelf).unwrap(), DeleteOutcome::NotFound);
    assert!(matches!(
        c.get_location(shelf),
        Err(LocationError::NotFound(id)) if id == shelf
    ));
}

#[test]
fn test_migrate_is_repeatable() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let from = fixtures::location(c, "Old shelf", None);
    let to = fixtures::location(c, "New shelf", None);
    for name in ["One", "Two", "Three"] {
        fixtures::add_game(c, fixtures::manual_game(name).at(from));
    }

    assert_eq!(c.migrate_games(from, to).unwrap(), 3);
    assert_eq!(c.migrate_games(from, to).unwrap(), 0);
    assert_eq!(c.list_games_at(to).unwrap().len(), 3);
    assert_eq!(c.delete_location(from).unwrap(), DeleteOutcome::Deleted);
}

#[test]
fn test_health_is_cached_until_refresh() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let shelf = fixtures::location(c, "Shelf", None);
    let tag = fixtures::entity(c, EntityKind::Tag, "favourite");
    let platform = fixtures::entity(c, EntityKind::Platform, "PS1");

    fixtures::add_game(
        c,
        fixtures::imported_game("Complete", 77)
            .at(shelf)
            .with_facet(EntityKind::Tag, &[tag])
            .with_facet(EntityKind::Platform, &[platform]),
    );
    let broken = fixtures::add_game(
        c,
        fixtures::manual_game("Bare")
            .at(shelf)
            .with_facet(EntityKind::Platform, &[platform]),
    );

    let (stats, clock) = h.stats(300);
    let health = stats.health().unwrap();
    assert_eq!(health.payload.missing_cover, 1);
    assert_eq!(health.payload.untagged, 1);
    let details = stats.health_details(HealthMetric::MissingCover).unwrap();
    assert_eq!(details.game_ids, vec![broken]);

    // Fix the game; the cached counts stay until the TTL runs out
    c.update_game(
        broken,
        &GameUpdate {
            cover_url: Some("https://images.igdb.com/fixed.jpg".to_string()),
            tag_ids: Some(vec![tag]),
            ..Default::default()
        },
    )
    .unwrap();
    clock.advance(Duration::seconds(120));
    let cached = stats.health().unwrap();
    assert!(Arc::ptr_eq(&health.payload, &cached.payload));
    assert_eq!(cached.payload.missing_cover, 1);

    stats.refresh().unwrap();
    let fresh = stats.health().unwrap();
    assert_eq!(fresh.payload.missing_cover, 0);
    assert_eq!(fresh.payload.untagged, 0);
    assert!(stats
        .health_details(HealthMetric::MissingCover)
        .unwrap()
        .game_ids
        .is_empty());
}

#[test]
fn test_overview_dedupes_copies() {
    let h = TestHarness::new();
    let c = &h.catalog;
    fixtures::add_game(c, fixtures::imported_game("X", 50));
    fixtures::add_game(c, fixtures::imported_game("X", 50));
    fixtures::add_game(c, fixtures::manual_game("Y"));

    let (stats, _) = h.stats(300);
    let overview = stats.overview().unwrap();
    assert_eq!(overview.payload.total_games, 3);
    assert_eq!(overview.payload.total_games_unique, 2);

    let health = stats.health().unwrap();
    assert_eq!(health.payload.total_games, 3);
    assert_eq!(health.payload.total_games_unique, 2);
}

#[test]
fn test_recompute_is_byte_identical() {
    let h = TestHarness::new();
    let c = &h.catalog;
    let genre = fixtures::entity(c, EntityKind::Genre, "Puzzle");
    for (i, name) in ["Tetris", "Dr. Mario", "Columns"].iter().enumerate() {
        fixtures::add_game(
            c,
            fixtures::imported_game(name, 100 + i as i64).with_facet(EntityKind::Genre, &[genre]),
        );
    }

    let (stats, _) = h.stats(300);
    let first = serde_json::to_vec(stats.overview().unwrap().payload.as_ref()).unwrap();
    stats.refresh().unwrap();
    let second = serde_json::to_vec(stats.overview().unwrap().payload.as_ref()).unwrap();
    assert_eq!(first, second);
}
