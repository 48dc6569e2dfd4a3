//! Pure stats computations over a snapshot of game rows.
//!
//! Nothing here touches storage or the cache; the aggregator service feeds
//! these functions and caches what they return.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::types::{
    GameRow, HealthDetailIds, HealthStats, OverviewStats, RankedEntity, RatedTitle, ReleaseRange,
    TitleAggregate, YearCount,
};
use crate::catalog::{EntityKind, TitleKey};

pub const TOP_GENRES: usize = 5;
pub const TOP_PLATFORMS: usize = 5;
pub const TOP_PUBLISHERS: usize = 5;
pub const TOP_DEVELOPERS: usize = 10;
pub const TOP_YEARS: usize = 5;
pub const TOP_RATED: usize = 10;

const UNKNOWN_NAME: &str = "Unknown";

/// Display names for ranked entities, by kind.
#[derive(Debug, Clone, Default)]
pub struct EntityNames {
    names: HashMap<EntityKind, HashMap<i64, String>>,
}

impl EntityNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: EntityKind, names: HashMap<i64, String>) {
        self.names.insert(kind, names);
    }

    /// Name of an entity, or "Unknown" if it vanished since the snapshot.
    pub fn name(&self, kind: EntityKind, id: i64) -> String {
        self.names
            .get(&kind)
            .and_then(|names| names.get(&id))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }
}

#[derive(Default)]
struct TitleBuilder {
    rep_game_id: i64,
    igdb_id: i64,
    name: String,
    years: BTreeSet<i32>,
    platform_ids: BTreeSet<i64>,
    genre_ids: BTreeSet<i64>,
    publisher_ids: BTreeSet<i64>,
    developer_ids: BTreeSet<i64>,
    ratings: Vec<i32>,
}

impl TitleBuilder {
    fn add(&mut self, row: &GameRow) {
        self.years.extend(row.known_year());
        self.platform_ids.extend(&row.platform_ids);
        self.genre_ids.extend(&row.genre_ids);
        for (company_id, roles) in &row.companies {
            if roles.publisher {
                self.publisher_ids.insert(*company_id);
            }
            if roles.developer {
                self.developer_ids.insert(*company_id);
            }
        }
        self.ratings.extend(row.rating);
    }

    fn finish(self, key: TitleKey) -> TitleAggregate {
        TitleAggregate {
            key,
            rep_game_id: self.rep_game_id,
            igdb_id: self.igdb_id,
            name: self.name,
            years: self.years.into_iter().collect(),
            platform_ids: self.platform_ids.into_iter().collect(),
            genre_ids: self.genre_ids.into_iter().collect(),
            publisher_ids: self.publisher_ids.into_iter().collect(),
            developer_ids: self.developer_ids.into_iter().collect(),
            ratings: self.ratings,
        }
    }
}

/// Fold rows into one aggregate per logical title, ordered by representative id.
///
/// The copy with the lowest row id represents the title.
pub fn fold_titles(rows: &[GameRow]) -> Vec<TitleAggregate> {
    let mut ordered: Vec<&GameRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.id);

    let mut builders: BTreeMap<TitleKey, TitleBuilder> = BTreeMap::new();
    for row in ordered {
        let builder = builders.entry(row.title_key()).or_insert_with(|| TitleBuilder {
            rep_game_id: row.id,
            igdb_id: row.igdb_id,
            name: row.name.clone(),
            ..Default::default()
        });
        builder.add(row);
    }

    let mut titles: Vec<TitleAggregate> = builders
        .into_iter()
        .map(|(key, builder)| builder.finish(key))
        .collect();
    titles.sort_by_key(|t| t.rep_game_id);
    titles
}

/// Count each row independently for issue detection.
///
/// A game stored in the default location counts as having no location.
pub fn compute_health(
    rows: &[GameRow],
    default_location_id: Option<i64>,
) -> (HealthStats, HealthDetailIds) {
    let mut details = HealthDetailIds::default();

    let mut ordered: Vec<&GameRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.id);

    for row in &ordered {
        if !row.has_cover() {
            details.missing_cover.push(row.id);
        }
        if row.known_year().is_none() {
            details.missing_release_year.push(row.id);
        }
        if row.platform_ids.is_empty() {
            details.no_platforms.push(row.id);
        }
        let placed = row
            .location_id
            .is_some_and(|id| Some(id) != default_location_id);
        if !placed {
            details.no_location.push(row.id);
        }
        if row.tag_count == 0 {
            details.untagged.push(row.id);
        }
    }

    let unique: BTreeSet<TitleKey> = rows.iter().map(GameRow::title_key).collect();

    let stats = HealthStats {
        missing_cover: details.missing_cover.len() as u64,
        missing_release_year: details.missing_release_year.len() as u64,
        no_platforms: details.no_platforms.len() as u64,
        no_location: details.no_location.len() as u64,
        untagged: details.untagged.len() as u64,
        total_games_unique: unique.len() as u64,
        total_games: rows.len() as u64,
    };

    (stats, details)
}

/// Count titles per id and keep the top `n`, by count desc then id asc.
fn rank<'a>(
    id_lists: impl Iterator<Item = &'a Vec<i64>>,
    n: usize,
    kind: EntityKind,
    names: &EntityNames,
) -> Vec<RankedEntity> {
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for ids in id_lists {
        for id in ids {
            *counts.entry(*id).or_default() += 1;
        }
    }

    let mut ranked: Vec<(i64, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(id, count)| RankedEntity {
            id,
            name: names.name(kind, id),
            count,
        })
        .collect()
}

/// Build the deduplicated overview.
pub fn compute_overview(rows: &[GameRow], names: &EntityNames) -> OverviewStats {
    let titles = fold_titles(rows);

    let title_years: Vec<i32> = titles
        .iter()
        .filter_map(TitleAggregate::representative_year)
        .collect();
    let release_range = ReleaseRange {
        oldest_year: title_years.iter().copied().min(),
        newest_year: title_years.iter().copied().max(),
    };

    let mut year_counts: BTreeMap<i32, u64> = BTreeMap::new();
    for year in &title_years {
        *year_counts.entry(*year).or_default() += 1;
    }
    let mut top_years: Vec<YearCount> = year_counts
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect();
    top_years.sort_by(|a, b| b.count.cmp(&a.count).then(a.year.cmp(&b.year)));
    top_years.truncate(TOP_YEARS);

    let rated: Vec<RatedTitle> = titles
        .iter()
        .filter_map(|t| {
            t.average_rating().map(|rating| RatedTitle {
                game_id: t.rep_game_id,
                igdb_id: t.igdb_id,
                name: t.name.clone(),
                rating,
            })
        })
        .collect();

    let mut top_highest_rated = rated.clone();
    top_highest_rated.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then_with(|| a.name.cmp(&b.name))
            .then(a.game_id.cmp(&b.game_id))
    });
    top_highest_rated.truncate(TOP_RATED);

    let mut top_lowest_rated: Vec<RatedTitle> =
        rated.into_iter().filter(|t| t.rating > 0.0).collect();
    top_lowest_rated.sort_by(|a, b| {
        a.rating
            .total_cmp(&b.rating)
            .then_with(|| a.name.cmp(&b.name))
            .then(a.game_id.cmp(&b.game_id))
    });
    top_lowest_rated.truncate(TOP_RATED);

    OverviewStats {
        total_games: rows.len() as u64,
        total_games_unique: titles.len() as u64,
        release_range,
        top_genres: rank(
            titles.iter().map(|t| &t.genre_ids),
            TOP_GENRES,
            EntityKind::Genre,
            names,
        ),
        top_platforms: rank(
            titles.iter().map(|t| &t.platform_ids),
            TOP_PLATFORMS,
            EntityKind::Platform,
            names,
        ),
        top_publishers: rank(
            titles.iter().map(|t| &t.publisher_ids),
            TOP_PUBLISHERS,
            EntityKind::Company,
            names,
        ),
        top_developers: rank(
            titles.iter().map(|t| &t.developer_ids),
            TOP_DEVELOPERS,
            EntityKind::Company,
            names,
        ),
        top_years,
        top_highest_rated,
        top_lowest_rated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CompanyRoles;

    fn row(id: i64, igdb_id: i64, name: &str) -> GameRow {
        GameRow {
            id,
            igdb_id,
            name: name.to_string(),
            cover_url: Some(format!("https://covers.example/{id}.jpg")),
            release_year: Some(2000),
            location_id: Some(10),
            platform_ids: vec![1],
            tag_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_copies_fold_and_manual_rows_stay_apart() {
        // X (igdb 50) twice, manual Y once
        let rows = vec![row(1, 50, "X"), row(2, 50, "X"), row(3, 0, "Y")];

        let overview = compute_overview(&rows, &EntityNames::new());
        assert_eq!(overview.total_games, 3);
        assert_eq!(overview.total_games_unique, 2);

        let (health, _) = compute_health(&rows, None);
        assert_eq!(health.total_games, 3);
        assert_eq!(health.total_games_unique, 2);
    }

    #[test]
    fn test_two_manual_rows_with_same_name_never_fold() {
        let rows = vec![row(1, 0, "Homebrew"), row(2, 0, "Homebrew")];
        assert_eq!(fold_titles(&rows).len(), 2);
    }

    #[test]
    fn test_fold_unions_relations_and_keeps_lowest_id() {
        let mut a = row(7, 50, "Zelda");
        a.release_year = Some(1998);
        a.platform_ids = vec![1];
        a.companies = vec![(
            100,
            CompanyRoles {
                developer: true,
                ..Default::default()
            },
        )];
        a.rating = Some(90);

        let mut b = row(3, 50, "Zelda");
        b.release_year = Some(2011);
        b.platform_ids = vec![2];
        b.companies = vec![(
            101,
            CompanyRoles {
                publisher: true,
                ..Default::default()
            },
        )];
        b.rating = Some(80);

        let titles = fold_titles(&[a, b]);
        assert_eq!(titles.len(), 1);
        let t = &titles[0];
        assert_eq!(t.rep_game_id, 3);
        assert_eq!(t.years, vec![1998, 2011]);
        assert_eq!(t.representative_year(), Some(1998));
        assert_eq!(t.platform_ids, vec![1, 2]);
        assert_eq!(t.developer_ids, vec![100]);
        assert_eq!(t.publisher_ids, vec![101]);
        assert_eq!(t.average_rating(), Some(85.0));
    }

    #[test]
    fn test_health_counts_rows_and_lists_ids() {
        let mut broken = row(2, 50, "Broken");
        broken.cover_url = None;
        broken.tag_count = 0;
        // Same title as row 1, still counted on its own
        let rows = vec![row(1, 50, "Fine"), broken];

        let (health, details) = compute_health(&rows, None);
        assert_eq!(health.missing_cover, 1);
        assert_eq!(health.untagged, 1);
        assert_eq!(details.missing_cover, vec![2]);
        assert_eq!(details.untagged, vec![2]);
        assert_eq!(health.no_platforms, 0);
        assert!(details.no_platforms.is_empty());
    }

    #[test]
    fn test_default_location_counts_as_no_location() {
        let mut unplaced = row(2, 0, "Unplaced");
        unplaced.location_id = None;
        let mut defaulted = row(3, 0, "Defaulted");
        defaulted.location_id = Some(99);
        let rows = vec![row(1, 0, "Placed"), unplaced, defaulted];

        let (health, details) = compute_health(&rows, Some(99));
        assert_eq!(health.no_location, 2);
        assert_eq!(details.no_location, vec![2, 3]);
    }

    #[test]
    fn test_non_positive_year_is_missing() {
        let mut zero = row(1, 0, "Zero");
        zero.release_year = Some(0);
        let mut none = row(2, 0, "None");
        none.release_year = None;

        let (health, details) = compute_health(&[zero, none, row(3, 0, "Ok")], None);
        assert_eq!(health.missing_release_year, 2);
        assert_eq!(details.missing_release_year, vec![1, 2]);
    }

    #[test]
    fn test_rankings_break_ties_by_id() {
        let mut rows = Vec::new();
        for (id, genres) in [(1, vec![30, 20]), (2, vec![20, 30]), (3, vec![10])] {
            let mut r = row(id, 0, &format!("G{id}"));
            r.genre_ids = genres;
            rows.push(r);
        }
        let mut names = EntityNames::new();
        names.insert(
            EntityKind::Genre,
            HashMap::from([(20, "RPG".to_string()), (30, "Action".to_string())]),
        );

        let overview = compute_overview(&rows, &names);
        let ranked: Vec<(i64, &str, u64)> = overview
            .top_genres
            .iter()
            .map(|r| (r.id, r.name.as_str(), r.count))
            .collect();
        assert_eq!(
            ranked,
            vec![(20, "RPG", 2), (30, "Action", 2), (10, "Unknown", 1)]
        );
    }

    #[test]
    fn test_top_lists_are_truncated() {
        let rows: Vec<GameRow> = (1..=12)
            .map(|id| {
                let mut r = row(id, 0, &format!("Game {id:02}"));
                r.companies = vec![(
                    id,
                    CompanyRoles {
                        developer: true,
                        publisher: true,
                        ..Default::default()
                    },
                )];
                r.platform_ids = vec![id];
                r.release_year = Some(1990 + id as i32);
                r.rating = Some(50 + id as i32);
                r
            })
            .collect();

        let overview = compute_overview(&rows, &EntityNames::new());
        assert_eq!(overview.top_developers.len(), TOP_DEVELOPERS);
        assert_eq!(overview.top_publishers.len(), TOP_PUBLISHERS);
        assert_eq!(overview.top_platforms.len(), TOP_PLATFORMS);
        assert_eq!(overview.top_years.len(), TOP_YEARS);
        assert_eq!(overview.top_years[0], YearCount { year: 1991, count: 1 });
        assert_eq!(overview.top_highest_rated.len(), TOP_RATED);
        assert_eq!(overview.top_highest_rated[0].name, "Game 12");
        assert_eq!(overview.top_lowest_rated[0].name, "Game 01");
        assert_eq!(
            overview.release_range,
            ReleaseRange {
                oldest_year: Some(1991),
                newest_year: Some(2002)
            }
        );
    }

    #[test]
    fn test_rated_titles_tie_break_on_name_and_skip_non_positive_lows() {
        let mut rows = Vec::new();
        for (id, name, rating) in [(1, "Beta", 70), (2, "Alpha", 70), (3, "Unrated", 0)] {
            let mut r = row(id, 0, name);
            r.rating = Some(rating);
            rows.push(r);
        }

        let overview = compute_overview(&rows, &EntityNames::new());
        let high: Vec<&str> = overview
            .top_highest_rated
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(high, vec!["Alpha", "Beta", "Unrated"]);

        let low: Vec<&str> = overview
            .top_lowest_rated
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(low, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let rows = vec![row(2, 50, "X"), row(1, 50, "X"), row(3, 0, "Y")];
        let names = EntityNames::new();
        let first = serde_json::to_vec(&compute_overview(&rows, &names)).unwrap();
        let second = serde_json::to_vec(&compute_overview(&rows, &names)).unwrap();
        assert_eq!(first, second);
    }
}
