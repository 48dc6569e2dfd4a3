//! Typed search filter.
//!
//! A [`GameFilter`] is fully validated before any SQL is built; see
//! [`GameFilter::from_params`] for the wire format.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::FacetKind;

/// How a facet's id list combines against a game's related ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At least one listed id is related.
    #[default]
    Any,
    /// Every listed id is related; extra relations are fine.
    All,
    /// The related ids are exactly the listed ids.
    Exact,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            "exact" => Ok(MatchMode::Exact),
            other => Err(format!(
                "unknown match mode '{other}', expected one of: any, all, exact"
            )),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Any => write!(f, "any"),
            MatchMode::All => write!(f, "all"),
            MatchMode::Exact => write!(f, "exact"),
        }
    }
}

/// Id set and match mode for one facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetFilter {
    pub ids: BTreeSet<i64>,
    pub mode: MatchMode,
}

impl FacetFilter {
    pub fn new(ids: impl IntoIterator<Item = i64>, mode: MatchMode) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            mode,
        }
    }

    pub fn any(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::new(ids, MatchMode::Any)
    }

    pub fn all(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::new(ids, MatchMode::All)
    }

    pub fn exact(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::new(ids, MatchMode::Exact)
    }

    /// Whether a game with `related` ids in this facet passes.
    ///
    /// An empty id set constrains nothing under `any`/`all`; under `exact`
    /// it requires the game to have no relations in the facet.
    pub fn matches(&self, related: &BTreeSet<i64>) -> bool {
        match self.mode {
            MatchMode::Any => self.ids.is_empty() || !self.ids.is_disjoint(related),
            MatchMode::All => self.ids.is_subset(related),
            MatchMode::Exact => &self.ids == related,
        }
    }
}

/// Manual-entry toggle (`include_manual`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualFilter {
    /// No filtering on entry source.
    #[default]
    Include,
    /// Catalog-sourced games only.
    Exclude,
    /// Manual entries only.
    Only,
}

impl FromStr for ManualFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(ManualFilter::Include),
            "false" => Ok(ManualFilter::Exclude),
            "only" => Ok(ManualFilter::Only),
            other => Err(format!(
                "unknown value '{other}', expected one of: true, false, only"
            )),
        }
    }
}

/// Release-year constraint. An exact year always wins over a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    Exact(i32),
    Range { min: Option<i32>, max: Option<i32> },
}

impl YearFilter {
    pub fn matches(&self, year: Option<i32>) -> bool {
        let Some(year) = year else {
            return false;
        };
        match *self {
            YearFilter::Exact(exact) => year == exact,
            YearFilter::Range { min, max } => {
                min.is_none_or(|min| year >= min) && max.is_none_or(|max| year <= max)
            }
        }
    }
}

/// Location constraint, optionally expanded to every descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationFilter {
    pub id: i64,
    pub include_descendants: bool,
}

/// A complete, validated game search.
///
/// All constraints combine with AND. Results are ordered case-insensitively
/// by name, then by row id, before `limit`/`offset` apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFilter {
    /// Case-insensitive substring of the game name.
    pub name: Option<String>,
    pub year: Option<YearFilter>,
    pub facets: BTreeMap<FacetKind, FacetFilter>,
    pub collection_id: Option<i64>,
    pub location: Option<LocationFilter>,
    pub manual: ManualFilter,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl GameFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn year(mut self, year: YearFilter) -> Self {
        self.year = Some(year);
        self
    }

    pub fn facet(mut self, kind: FacetKind, filter: FacetFilter) -> Self {
        self.facets.insert(kind, filter);
        self
    }

    pub fn collection(mut self, collection_id: i64) -> Self {
        self.collection_id = Some(collection_id);
        self
    }

    pub fn location(mut self, id: i64, include_descendants: bool) -> Self {
        self.location = Some(LocationFilter {
            id,
            include_descendants,
        });
        self
    }

    pub fn manual(mut self, manual: ManualFilter) -> Self {
        self.manual = manual;
        self
    }

    pub fn page(mut self, limit: Option<u32>, offset: Option<u32>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}
