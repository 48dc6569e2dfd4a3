//! Game search - faceted filtering and autocomplete suggestions.
//!
//! Raw parameters are parsed into a [`GameFilter`] first; the SQLite
//! implementation only ever sees the typed filter.

mod filter;
mod params;
mod sqlite;

pub use filter::{FacetFilter, GameFilter, LocationFilter, ManualFilter, MatchMode, YearFilter};

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, EntityKind, Game, NamedEntity};

/// Maximum number of suggestions returned.
pub const SUGGESTION_LIMIT: usize = 10;

/// Minimum query length (in characters, after trimming) for suggestions.
pub const SUGGESTION_MIN_CHARS: usize = 2;

/// Errors for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid parameter '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("No search filters provided")]
    NoFilters,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SearchError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        SearchError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// What a suggestion query completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestKind {
    Names,
    Tags,
    Genres,
    Modes,
    Collections,
    Companies,
    IgdbTags,
}

impl SuggestKind {
    /// Parse the path segment used by the HTTP layer.
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "names" => Some(SuggestKind::Names),
            "tags" => Some(SuggestKind::Tags),
            "genres" => Some(SuggestKind::Genres),
            "modes" => Some(SuggestKind::Modes),
            "collections" => Some(SuggestKind::Collections),
            "companies" => Some(SuggestKind::Companies),
            "igdb_tags" => Some(SuggestKind::IgdbTags),
            _ => None,
        }
    }

    /// Entity table the suggestion draws from; `None` for game names.
    pub fn entity(self) -> Option<EntityKind> {
        match self {
            SuggestKind::Names => None,
            SuggestKind::Tags => Some(EntityKind::Tag),
            SuggestKind::Genres => Some(EntityKind::Genre),
            SuggestKind::Modes => Some(EntityKind::Mode),
            SuggestKind::Collections => Some(EntityKind::Collection),
            SuggestKind::Companies => Some(EntityKind::Company),
            SuggestKind::IgdbTags => Some(EntityKind::IgdbTag),
        }
    }
}

/// Suggestion results: bare names for games, `(id, name)` pairs otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Suggestions {
    Names(Vec<String>),
    Entities(Vec<NamedEntity>),
}

impl Suggestions {
    pub fn len(&self) -> usize {
        match self {
            Suggestions::Names(names) => names.len(),
            Suggestions::Entities(entities) => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validate and trim a suggestion query.
pub fn suggestion_query(q: &str) -> Result<&str, SearchError> {
    let q = q.trim();
    if q.chars().count() < SUGGESTION_MIN_CHARS {
        return Err(SearchError::validation(
            "q",
            format!("query must be at least {SUGGESTION_MIN_CHARS} characters"),
        ));
    }
    Ok(q)
}

/// Search over the catalog.
pub trait GameSearch: Send + Sync {
    /// Games matching every constraint of `filter`, ordered by name.
    ///
    /// Each returned game carries its location path.
    fn search_games(&self, filter: &GameFilter) -> Result<Vec<Game>, SearchError>;

    /// Up to [`SUGGESTION_LIMIT`] game names containing `q`.
    fn suggest_names(&self, q: &str) -> Result<Vec<String>, SearchError>;

    /// Up to [`SUGGESTION_LIMIT`] entities of `kind` whose name contains `q`.
    fn suggest_entities(&self, kind: EntityKind, q: &str)
        -> Result<Vec<NamedEntity>, SearchError>;

    fn suggest(&self, kind: SuggestKind, q: &str) -> Result<Suggestions, SearchError> {
        match kind.entity() {
            None => self.suggest_names(q).map(Suggestions::Names),
            Some(entity) => self.suggest_entities(entity, q).map(Suggestions::Entities),
        }
    }
}
