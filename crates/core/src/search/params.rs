//! Query-parameter parsing for game search.
//!
//! Parameters arrive as raw `(key, value)` string pairs (keys may repeat).
//! Everything is validated here; query building never sees raw strings.

use std::collections::BTreeSet;
use std::str::FromStr;

use super::filter::{FacetFilter, GameFilter, LocationFilter, ManualFilter, MatchMode, YearFilter};
use super::SearchError;
use crate::catalog::FacetKind;

/// Id keys and match-mode keys per facet. The first mode key wins when
/// several are given; later ones are legacy aliases.
const FACET_PARAMS: [(FacetKind, &[&str], &[&str]); 7] = [
    (FacetKind::Platform, &["platform_ids", "platform_id"], &["platform_match_mode"]),
    (FacetKind::Tag, &["tag_ids"], &["tag_match_mode", "match_mode"]),
    (FacetKind::Genre, &["genre_ids"], &["genre_match_mode"]),
    (FacetKind::Mode, &["mode_ids"], &["mode_match_mode"]),
    (FacetKind::Perspective, &["perspective_ids"], &["perspective_match_mode"]),
    (FacetKind::IgdbTag, &["igdb_tag_ids"], &["igdb_tag_match_mode", "igdb_match_mode"]),
    (FacetKind::Company, &["company_ids", "company_id"], &["company_match_mode"]),
];

const SCALAR_FILTER_PARAMS: [&str; 8] = [
    "name",
    "year",
    "year_min",
    "year_max",
    "collection_id",
    "location_id",
    "include_location_descendants",
    "include_manual",
];

/// Borrowed view over raw parameters with empty values dropped.
struct Params<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Params<'a> {
    fn new(raw: &'a [(String, String)]) -> Self {
        let pairs = raw
            .iter()
            .map(|(k, v)| (k.as_str(), v.trim()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { pairs }
    }

    fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| *k == key)
    }

    fn first(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn all(&self, key: &str) -> Vec<&'a str> {
        self.pairs
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .collect()
    }

    fn parse<T: FromStr>(&self, key: &str, what: &str) -> Result<Option<T>, SearchError> {
        self.first(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| SearchError::validation(key, format!("{what}, got '{v}'")))
            })
            .transpose()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SearchError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(SearchError::validation(
            key,
            format!("must be true or false, got '{value}'"),
        )),
    }
}

impl GameFilter {
    /// Build a filter from raw query parameters.
    ///
    /// Unknown keys are ignored. Fails with [`SearchError::NoFilters`] when
    /// no filtering parameter is present at all (pagination alone does not
    /// count), and with [`SearchError::Validation`] naming the parameter for
    /// any malformed value.
    pub fn from_params(raw: &[(String, String)]) -> Result<Self, SearchError> {
        let params = Params::new(raw);

        let supplied = SCALAR_FILTER_PARAMS.iter().any(|k| params.contains(k))
            || FACET_PARAMS
                .iter()
                .flat_map(|(_, ids, modes)| ids.iter().chain(modes.iter()))
                .any(|k| params.contains(k));
        if !supplied {
            return Err(SearchError::NoFilters);
        }

        let mut filter = GameFilter::new();

        filter.name = params.first("name").map(str::to_string);

        let year: Option<i32> = params.parse("year", "must be an integer")?;
        let year_min: Option<i32> = params.parse("year_min", "must be an integer")?;
        let year_max: Option<i32> = params.parse("year_max", "must be an integer")?;
        filter.year = match (year, year_min, year_max) {
            (Some(exact), _, _) => Some(YearFilter::Exact(exact)),
            (None, None, None) => None,
            (None, min, max) => Some(YearFilter::Range { min, max }),
        };

        for (kind, id_keys, mode_keys) in FACET_PARAMS {
            let mut mode = None;
            for key in mode_keys {
                if let Some(value) = params.first(key) {
                    let parsed = value
                        .parse::<MatchMode>()
                        .map_err(|message| SearchError::validation(key, message))?;
                    mode.get_or_insert(parsed);
                }
            }

            let mut ids = BTreeSet::new();
            let mut present = false;
            for key in id_keys {
                for value in params.all(key) {
                    present = true;
                    let id = value.parse::<i64>().map_err(|_| {
                        SearchError::validation(key, format!("must be integers, got '{value}'"))
                    })?;
                    ids.insert(id);
                }
            }

            if present {
                filter
                    .facets
                    .insert(kind, FacetFilter::new(ids, mode.unwrap_or_default()));
            }
        }

        filter.collection_id = params.parse("collection_id", "must be an integer")?;

        let location_id: Option<i64> = params.parse("location_id", "must be an integer")?;
        let include_descendants = params
            .first("include_location_descendants")
            .map(|v| parse_bool("include_location_descendants", v))
            .transpose()?
            .unwrap_or(false);
        filter.location = location_id.map(|id| LocationFilter {
            id,
            include_descendants,
        });

        if let Some(value) = params.first("include_manual") {
            filter.manual = value
                .parse::<ManualFilter>()
                .map_err(|message| SearchError::validation("include_manual", message))?;
        }

        filter.limit = params.parse("limit", "must be a non-negative integer")?;
        filter.offset = params.parse("offset", "must be a non-negative integer")?;

        Ok(filter)
    }
}
