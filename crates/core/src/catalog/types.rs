//! Types for the game catalog (entity graph shared by search, locations and stats).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A physical copy of a game in the collection.
///
/// Several rows may describe the same logical title; see [`TitleKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    /// External catalog (IGDB) id. `None` or `Some(0)` marks a manual entry.
    pub igdb_id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Physical condition, as graded by the owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<i32>,
    /// Popularity rating from the external catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Manual display order within a location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
    /// Root-first path of the game's storage location (filled on read).
    #[serde(default)]
    pub location_path: Vec<LocationPathEntry>,
}

impl Game {
    /// Dedupe key of this row.
    pub fn title_key(&self) -> TitleKey {
        TitleKey::new(self.id, self.igdb_id)
    }

    /// Whether this row was entered by hand rather than imported.
    pub fn is_manual(&self) -> bool {
        matches!(self.title_key(), TitleKey::Manual(_))
    }
}

/// Identity of a logical title.
///
/// Two rows are the same title iff both carry the same non-zero external id.
/// Manual rows never merge: each one is keyed by its own row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TitleKey {
    Igdb(i64),
    Manual(i64),
}

impl TitleKey {
    pub fn new(row_id: i64, igdb_id: Option<i64>) -> Self {
        match igdb_id {
            Some(igdb_id) if igdb_id != 0 => TitleKey::Igdb(igdb_id),
            _ => TitleKey::Manual(row_id),
        }
    }
}

/// A game with all of its relations loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDetail {
    #[serde(flatten)]
    pub game: Game,
    pub platforms: Vec<NamedEntity>,
    pub genres: Vec<NamedEntity>,
    pub modes: Vec<NamedEntity>,
    pub perspectives: Vec<NamedEntity>,
    pub tags: Vec<NamedEntity>,
    pub igdb_tags: Vec<NamedEntity>,
    pub companies: Vec<CompanyLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<NamedEntity>,
}

/// A plain (id, name) pair for any facet target, collection or company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}

/// Roles a company played for one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRoles {
    #[serde(default)]
    pub developer: bool,
    #[serde(default)]
    pub publisher: bool,
    #[serde(default)]
    pub porting: bool,
    #[serde(default)]
    pub supporting: bool,
}

/// A company attached to a game, with its role flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyLink {
    pub company_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub roles: CompanyRoles,
}

/// Company reference used when creating or updating a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRoleInput {
    pub company_id: i64,
    #[serde(flatten)]
    pub roles: CompanyRoles,
}

/// A storage location node. Locations form a forest via `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Free-form type label, e.g. "shelf" or "box".
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One step of a root-to-leaf location path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPathEntry {
    pub id: i64,
    pub name: String,
}

/// Kinds of standalone catalog entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Platform,
    Genre,
    Mode,
    Perspective,
    Tag,
    IgdbTag,
    Company,
    Collection,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Platform,
        EntityKind::Genre,
        EntityKind::Mode,
        EntityKind::Perspective,
        EntityKind::Tag,
        EntityKind::IgdbTag,
        EntityKind::Company,
        EntityKind::Collection,
    ];

    /// Table holding the entities.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Platform => "platforms",
            EntityKind::Genre => "genres",
            EntityKind::Mode => "modes",
            EntityKind::Perspective => "player_perspectives",
            EntityKind::Tag => "tags",
            EntityKind::IgdbTag => "igdb_tags",
            EntityKind::Company => "companies",
            EntityKind::Collection => "collections",
        }
    }

    /// Parse the plural path segment used by the HTTP layer (`platforms`, `igdb_tags`, ...).
    pub fn from_plural(s: &str) -> Option<Self> {
        match s {
            "platforms" => Some(EntityKind::Platform),
            "genres" => Some(EntityKind::Genre),
            "modes" => Some(EntityKind::Mode),
            "perspectives" => Some(EntityKind::Perspective),
            "tags" => Some(EntityKind::Tag),
            "igdb_tags" => Some(EntityKind::IgdbTag),
            "companies" => Some(EntityKind::Company),
            "collections" => Some(EntityKind::Collection),
            _ => None,
        }
    }
}

/// A filterable many-to-many relation hanging off a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Platform,
    Tag,
    Genre,
    Mode,
    Perspective,
    IgdbTag,
    Company,
}

impl FacetKind {
    pub const ALL: [FacetKind; 7] = [
        FacetKind::Platform,
        FacetKind::Tag,
        FacetKind::Genre,
        FacetKind::Mode,
        FacetKind::Perspective,
        FacetKind::IgdbTag,
        FacetKind::Company,
    ];

    /// Join table linking games to the facet's targets.
    pub fn join_table(self) -> &'static str {
        match self {
            FacetKind::Platform => "game_platforms",
            FacetKind::Tag => "game_tags",
            FacetKind::Genre => "game_genres",
            FacetKind::Mode => "game_modes",
            FacetKind::Perspective => "game_perspectives",
            FacetKind::IgdbTag => "game_igdb_tags",
            FacetKind::Company => "game_companies",
        }
    }

    /// Column of the join table holding the target id.
    pub fn target_column(self) -> &'static str {
        match self {
            FacetKind::Platform => "platform_id",
            FacetKind::Tag => "tag_id",
            FacetKind::Genre => "genre_id",
            FacetKind::Mode => "mode_id",
            FacetKind::Perspective => "perspective_id",
            FacetKind::IgdbTag => "igdb_tag_id",
            FacetKind::Company => "company_id",
        }
    }

    pub fn entity(self) -> EntityKind {
        match self {
            FacetKind::Platform => EntityKind::Platform,
            FacetKind::Tag => EntityKind::Tag,
            FacetKind::Genre => EntityKind::Genre,
            FacetKind::Mode => EntityKind::Mode,
            FacetKind::Perspective => EntityKind::Perspective,
            FacetKind::IgdbTag => EntityKind::IgdbTag,
            FacetKind::Company => EntityKind::Company,
        }
    }
}

/// Input for creating a game row.
///
/// Relation lists are plain ids; shaping an external catalog payload into
/// these lists happens before the catalog is called.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGame {
    pub name: String,
    #[serde(default)]
    pub igdb_id: Option<i64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub condition: Option<i32>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub order: Option<i32>,
    /// `None` or `Some(0)` falls back to the default location.
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub collection_id: Option<i64>,
    #[serde(default)]
    pub platform_ids: Vec<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub mode_ids: Vec<i64>,
    #[serde(default)]
    pub perspective_ids: Vec<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub igdb_tag_ids: Vec<i64>,
    #[serde(default)]
    pub companies: Vec<CompanyRoleInput>,
}

impl NewGame {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a game row. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub condition: Option<i32>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub order: Option<i32>,
    /// `Some(0)` moves the game back to the default location.
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub collection_id: Option<i64>,
    #[serde(default)]
    pub platform_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub genre_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub mode_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub perspective_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub igdb_tag_ids: Option<Vec<i64>>,
}

impl GameUpdate {
    /// True when only location and display order are touched, the only
    /// fields editable on catalog-sourced games.
    pub fn is_placement_only(&self) -> bool {
        self.name.is_none()
            && self.summary.is_none()
            && self.release_year.is_none()
            && self.cover_url.is_none()
            && self.condition.is_none()
            && self.rating.is_none()
            && self.collection_id.is_none()
            && self.platform_ids.is_none()
            && self.genre_ids.is_none()
            && self.mode_ids.is_none()
            && self.perspective_ids.is_none()
            && self.tag_ids.is_none()
            && self.igdb_tag_ids.is_none()
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub(crate) fn db_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::Database(e.to_string())
}
