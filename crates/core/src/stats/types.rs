//! Types for collection statistics.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, CompanyRoles, TitleKey};

/// One physical copy, flattened with the relations stats need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRow {
    pub id: i64,
    /// 0 for manual entries.
    pub igdb_id: i64,
    pub name: String,
    pub release_year: Option<i32>,
    pub cover_url: Option<String>,
    pub rating: Option<i32>,
    pub location_id: Option<i64>,
    pub platform_ids: Vec<i64>,
    pub genre_ids: Vec<i64>,
    pub tag_count: usize,
    pub companies: Vec<(i64, CompanyRoles)>,
}

impl GameRow {
    pub fn title_key(&self) -> TitleKey {
        TitleKey::new(self.id, Some(self.igdb_id))
    }

    pub(crate) fn has_cover(&self) -> bool {
        self.cover_url.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Release year, if it is a plausible (positive) year.
    pub(crate) fn known_year(&self) -> Option<i32> {
        self.release_year.filter(|y| *y > 0)
    }
}

/// Copies of one logical title folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleAggregate {
    pub key: TitleKey,
    /// Lowest row id among the copies.
    pub rep_game_id: i64,
    pub igdb_id: i64,
    pub name: String,
    pub years: Vec<i32>,
    pub platform_ids: Vec<i64>,
    pub genre_ids: Vec<i64>,
    pub publisher_ids: Vec<i64>,
    pub developer_ids: Vec<i64>,
    pub ratings: Vec<i32>,
}

impl TitleAggregate {
    /// The oldest copy's year stands for the title.
    pub fn representative_year(&self) -> Option<i32> {
        self.years.iter().copied().min()
    }

    /// Mean of the collected ratings, rounded to two decimals.
    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let sum: i64 = self.ratings.iter().map(|r| i64::from(*r)).sum();
        let avg = sum as f64 / self.ratings.len() as f64;
        Some((avg * 100.0).round() / 100.0)
    }
}

/// Per-row library health counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStats {
    pub missing_cover: u64,
    pub missing_release_year: u64,
    pub no_platforms: u64,
    pub no_location: u64,
    pub untagged: u64,
    pub total_games_unique: u64,
    pub total_games: u64,
}

/// Offending row ids behind each [`HealthStats`] counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDetailIds {
    pub missing_cover: Vec<i64>,
    pub missing_release_year: Vec<i64>,
    pub no_platforms: Vec<i64>,
    pub no_location: Vec<i64>,
    pub untagged: Vec<i64>,
}

impl HealthDetailIds {
    pub fn get(&self, metric: HealthMetric) -> &[i64] {
        match metric {
            HealthMetric::MissingCover => &self.missing_cover,
            HealthMetric::MissingReleaseYear => &self.missing_release_year,
            HealthMetric::NoPlatforms => &self.no_platforms,
            HealthMetric::NoLocation => &self.no_location,
            HealthMetric::Untagged => &self.untagged,
        }
    }
}

/// A health counter with a detail list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthMetric {
    MissingCover,
    MissingReleaseYear,
    NoPlatforms,
    NoLocation,
    Untagged,
}

impl HealthMetric {
    pub const ALL: [HealthMetric; 5] = [
        HealthMetric::MissingCover,
        HealthMetric::MissingReleaseYear,
        HealthMetric::NoPlatforms,
        HealthMetric::NoLocation,
        HealthMetric::Untagged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HealthMetric::MissingCover => "missing_cover",
            HealthMetric::MissingReleaseYear => "missing_release_year",
            HealthMetric::NoPlatforms => "no_platforms",
            HealthMetric::NoLocation => "no_location",
            HealthMetric::Untagged => "untagged",
        }
    }
}

impl fmt::Display for HealthMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthMetric {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HealthMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| StatsError::UnknownMetric(s.to_string()))
    }
}

/// Detail list for one health metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDetails {
    pub metric: HealthMetric,
    pub count: usize,
    pub game_ids: Vec<i64>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRange {
    pub oldest_year: Option<i32>,
    pub newest_year: Option<i32>,
}

/// An entity ranked by the number of titles it appears on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub id: i64,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedTitle {
    pub game_id: i64,
    pub igdb_id: i64,
    pub name: String,
    pub rating: f64,
}

/// Deduplicated collection overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub total_games: u64,
    pub total_games_unique: u64,
    pub release_range: ReleaseRange,
    pub top_genres: Vec<RankedEntity>,
    pub top_platforms: Vec<RankedEntity>,
    pub top_publishers: Vec<RankedEntity>,
    pub top_developers: Vec<RankedEntity>,
    pub top_years: Vec<YearCount>,
    pub top_highest_rated: Vec<RatedTitle>,
    pub top_lowest_rated: Vec<RatedTitle>,
}

/// Errors for stats operations.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Unknown health metric: {0}")]
    UnknownMetric(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
