//! SQLite-backed game catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::types::db_err;
use super::{
    CatalogError, CompanyLink, CompanyRoleInput, CompanyRoles, EntityKind, FacetKind, Game,
    GameCatalog, GameDetail, GameUpdate, NamedEntity, NewGame,
};
use crate::config::LocationsConfig;
use crate::location::{ensure_default_location_in, location_path_in};

/// Column list matching [`row_to_game`], for queries aliasing `games` as `g`.
pub(crate) const GAME_COLUMNS: &str = "g.id, g.igdb_id, g.name, g.summary, g.release_year, \
     g.cover_url, g.condition, g.rating, g.last_synced_at, g.display_order, g.location_id, \
     g.collection_id";

/// Register `fold(text)`, a Unicode lowercase used for every name match and
/// name ordering. SQLite's built-in `lower()` only folds ASCII.
///
/// Must be registered before the schema is touched: `idx_games_name_fold`
/// is an expression index over it.
fn register_fold(conn: &Connection) -> Result<(), CatalogError> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
    .map_err(db_err)
}

/// SQLite-backed catalog.
///
/// One connection behind a mutex; the location, search and stats stores are
/// implemented on this same type in their own modules.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    locations: LocationsConfig,
}

impl SqliteCatalog {
    /// Open (or create) a catalog database file and ensure the schema exists.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, CatalogError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;
        register_fold(&conn)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            locations: LocationsConfig::default(),
        })
    }

    /// Override the default-location name and hierarchy walk cap.
    pub fn with_locations(mut self, config: LocationsConfig) -> Self {
        self.locations = config;
        self
    }

    pub fn locations_config(&self) -> &LocationsConfig {
        &self.locations
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            -- Storage locations; parent_id forms a forest
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent_id INTEGER REFERENCES locations(id),
                type TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_locations_parent ON locations(parent_id);

            CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS platforms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS genres (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS modes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS player_perspectives (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS igdb_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            -- One row per physical copy; igdb_id = 0 marks a manual entry
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                igdb_id INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL,
                summary TEXT,
                release_year INTEGER,
                cover_url TEXT,
                condition INTEGER,
                rating INTEGER,
                last_synced_at TEXT,
                display_order INTEGER,
                location_id INTEGER REFERENCES locations(id),
                collection_id INTEGER REFERENCES collections(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_igdb_id ON games(igdb_id);
            CREATE INDEX IF NOT EXISTS idx_games_location ON games(location_id);
            DROP INDEX IF EXISTS idx_games_name;
            CREATE INDEX IF NOT EXISTS idx_games_name_fold ON games(fold(name));

            CREATE TABLE IF NOT EXISTS game_platforms (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                platform_id INTEGER NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, platform_id)
            );

            CREATE TABLE IF NOT EXISTS game_genres (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, genre_id)
            );

            CREATE TABLE IF NOT EXISTS game_modes (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                mode_id INTEGER NOT NULL REFERENCES modes(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, mode_id)
            );

            CREATE TABLE IF NOT EXISTS game_perspectives (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                perspective_id INTEGER NOT NULL REFERENCES player_perspectives(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, perspective_id)
            );

            CREATE TABLE IF NOT EXISTS game_tags (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, tag_id)
            );

            CREATE TABLE IF NOT EXISTS game_igdb_tags (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                igdb_tag_id INTEGER NOT NULL REFERENCES igdb_tags(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, igdb_tag_id)
            );

            -- Company links carry role flags
            CREATE TABLE IF NOT EXISTS game_companies (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                developer INTEGER NOT NULL DEFAULT 0,
                publisher INTEGER NOT NULL DEFAULT 0,
                porting INTEGER NOT NULL DEFAULT 0,
                supporting INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (game_id, company_id)
            );

            CREATE INDEX IF NOT EXISTS idx_game_platforms_target ON game_platforms(platform_id);
            CREATE INDEX IF NOT EXISTS idx_game_genres_target ON game_genres(genre_id);
            CREATE INDEX IF NOT EXISTS idx_game_tags_target ON game_tags(tag_id);
            CREATE INDEX IF NOT EXISTS idx_game_companies_target ON game_companies(company_id);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    /// Resolve the location a game should be stored in.
    fn resolve_location(&self, conn: &Connection, requested: Option<i64>) -> Result<i64, CatalogError> {
        match requested {
            None | Some(0) => ensure_default_location_in(conn, &self.locations.default_name),
            Some(id) => {
                if row_exists(conn, "locations", id)? {
                    Ok(id)
                } else {
                    Err(CatalogError::NotFound(format!("location {id}")))
                }
            }
        }
    }

    /// Load a game with relations and its location path.
    fn load_detail(&self, conn: &Connection, id: i64) -> Result<GameDetail, CatalogError> {
        let mut game =
            fetch_game(conn, id)?.ok_or_else(|| CatalogError::NotFound(format!("game {id}")))?;

        if let Some(location_id) = game.location_id {
            game.location_path = location_path_in(conn, location_id, self.locations.max_depth)?;
        }

        let collection = match game.collection_id {
            Some(collection_id) => conn
                .query_row(
                    "SELECT id, name FROM collections WHERE id = ?",
                    params![collection_id],
                    row_to_named,
                )
                .optional()
                .map_err(db_err)?,
            None => None,
        };

        Ok(GameDetail {
            platforms: load_facet(conn, FacetKind::Platform, id)?,
            genres: load_facet(conn, FacetKind::Genre, id)?,
            modes: load_facet(conn, FacetKind::Mode, id)?,
            perspectives: load_facet(conn, FacetKind::Perspective, id)?,
            tags: load_facet(conn, FacetKind::Tag, id)?,
            igdb_tags: load_facet(conn, FacetKind::IgdbTag, id)?,
            companies: load_companies(conn, id)?,
            collection,
            game,
        })
    }
}

impl GameCatalog for SqliteCatalog {
    fn create_game(&self, game: &NewGame) -> Result<GameDetail, CatalogError> {
        let name = game.name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidInput(
                "game name must not be empty".to_string(),
            ));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let location_id = self.resolve_location(&tx, game.location_id)?;
        let collection_id = resolve_collection(&tx, game.collection_id)?;
        let igdb_id = game.igdb_id.unwrap_or(0);
        let last_synced_at = (igdb_id != 0).then(|| Utc::now().to_rfc3339());

        tx.execute(
            "INSERT INTO games (igdb_id, name, summary, release_year, cover_url, condition, rating,
                                last_synced_at, display_order, location_id, collection_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                igdb_id,
                name,
                game.summary,
                game.release_year,
                game.cover_url,
                game.condition,
                game.rating,
                last_synced_at,
                game.order,
                location_id,
                collection_id,
            ],
        )
        .map_err(db_err)?;
        let id = tx.last_insert_rowid();

        let facet_lists: [(FacetKind, &[i64]); 6] = [
            (FacetKind::Platform, game.platform_ids.as_slice()),
            (FacetKind::Genre, game.genre_ids.as_slice()),
            (FacetKind::Mode, game.mode_ids.as_slice()),
            (FacetKind::Perspective, game.perspective_ids.as_slice()),
            (FacetKind::Tag, game.tag_ids.as_slice()),
            (FacetKind::IgdbTag, game.igdb_tag_ids.as_slice()),
        ];
        for (facet, ids) in facet_lists {
            insert_facet_ids(&tx, facet, id, ids)?;
        }
        for link in &game.companies {
            insert_company_link(&tx, id, link)?;
        }

        tx.commit().map_err(db_err)?;

        info!(game_id = id, name, location_id, igdb_id, "Created game");
        self.load_detail(&conn, id)
    }

    fn update_game(&self, id: i64, update: &GameUpdate) -> Result<GameDetail, CatalogError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let current =
            fetch_game(&tx, id)?.ok_or_else(|| CatalogError::NotFound(format!("game {id}")))?;

        if !current.is_manual() && !update.is_placement_only() {
            return Err(CatalogError::InvalidInput(
                "games imported from the external catalog only accept location and order changes"
                    .to_string(),
            ));
        }

        let mut next = current.clone();
        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(CatalogError::InvalidInput(
                    "game name must not be empty".to_string(),
                ));
            }
            next.name = name.to_string();
        }
        if update.summary.is_some() {
            next.summary = update.summary.clone();
        }
        if update.cover_url.is_some() {
            next.cover_url = update.cover_url.clone();
        }
        next.release_year = update.release_year.or(next.release_year);
        next.condition = update.condition.or(next.condition);
        next.rating = update.rating.or(next.rating);
        next.order = update.order.or(next.order);
        if update.location_id.is_some() {
            next.location_id = Some(self.resolve_location(&tx, update.location_id)?);
        }
        if update.collection_id.is_some() {
            next.collection_id = resolve_collection(&tx, update.collection_id)?;
        }

        tx.execute(
            "UPDATE games SET name = ?1, summary = ?2, release_year = ?3, cover_url = ?4,
                              condition = ?5, rating = ?6, display_order = ?7,
                              location_id = ?8, collection_id = ?9
             WHERE id = ?10",
            params![
                next.name,
                next.summary,
                next.release_year,
                next.cover_url,
                next.condition,
                next.rating,
                next.order,
                next.location_id,
                next.collection_id,
                id,
            ],
        )
        .map_err(db_err)?;

        let facet_lists: [(FacetKind, &Option<Vec<i64>>); 6] = [
            (FacetKind::Platform, &update.platform_ids),
            (FacetKind::Genre, &update.genre_ids),
            (FacetKind::Mode, &update.mode_ids),
            (FacetKind::Perspective, &update.perspective_ids),
            (FacetKind::Tag, &update.tag_ids),
            (FacetKind::IgdbTag, &update.igdb_tag_ids),
        ];
        for (facet, ids) in facet_lists {
            if let Some(ids) = ids {
                let sql = format!("DELETE FROM {} WHERE game_id = ?", facet.join_table());
                tx.execute(&sql, params![id]).map_err(db_err)?;
                insert_facet_ids(&tx, facet, id, ids)?;
            }
        }

        tx.commit().map_err(db_err)?;

        debug!(game_id = id, "Updated game");
        self.load_detail(&conn, id)
    }

    fn get_game(&self, id: i64) -> Result<GameDetail, CatalogError> {
        let conn = self.conn()?;
        self.load_detail(&conn, id)
    }

    fn delete_game(&self, id: i64) -> Result<(), CatalogError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM games WHERE id = ?", params![id])
            .map_err(db_err)?;

        if deleted == 0 {
            return Err(CatalogError::NotFound(format!("game {id}")));
        }

        info!(game_id = id, "Deleted game");
        Ok(())
    }

    fn create_entity(&self, kind: EntityKind, name: &str) -> Result<NamedEntity, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidInput(
                "entity name must not be empty".to_string(),
            ));
        }

        let conn = self.conn()?;
        let table = kind.table();
        conn.execute(
            &format!("INSERT OR IGNORE INTO {table} (name) VALUES (?)"),
            params![name],
        )
        .map_err(db_err)?;

        conn.query_row(
            &format!("SELECT id, name FROM {table} WHERE name = ?"),
            params![name],
            row_to_named,
        )
        .map_err(db_err)
    }

    fn list_entities(&self, kind: EntityKind) -> Result<Vec<NamedEntity>, CatalogError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, name FROM {} ORDER BY fold(name) ASC, id ASC",
            kind.table()
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt.query_map([], row_to_named).map_err(db_err)?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row.map_err(db_err)?);
        }
        Ok(entities)
    }
}

/// Convert a row selected with [`GAME_COLUMNS`] into a [`Game`].
pub(crate) fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<Game> {
    let last_synced: Option<String> = row.get(8)?;
    let last_synced_at = last_synced
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Game {
        id: row.get(0)?,
        igdb_id: row.get(1)?,
        name: row.get(2)?,
        summary: row.get(3)?,
        release_year: row.get(4)?,
        cover_url: row.get(5)?,
        condition: row.get(6)?,
        rating: row.get(7)?,
        last_synced_at,
        order: row.get(9)?,
        location_id: row.get(10)?,
        collection_id: row.get(11)?,
        location_path: Vec::new(),
    })
}

fn row_to_named(row: &rusqlite::Row) -> rusqlite::Result<NamedEntity> {
    Ok(NamedEntity {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Fetch a bare game row (no relations, no path).
pub(crate) fn fetch_game(conn: &Connection, id: i64) -> Result<Option<Game>, CatalogError> {
    conn.query_row(
        &format!("SELECT {GAME_COLUMNS} FROM games g WHERE g.id = ?"),
        params![id],
        row_to_game,
    )
    .optional()
    .map_err(db_err)
}

pub(crate) fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool, CatalogError> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"),
        params![id],
        |row| row.get(0),
    )
    .map_err(db_err)
}

fn resolve_collection(conn: &Connection, requested: Option<i64>) -> Result<Option<i64>, CatalogError> {
    match requested {
        None | Some(0) => Ok(None),
        Some(id) => {
            if row_exists(conn, "collections", id)? {
                Ok(Some(id))
            } else {
                Err(CatalogError::NotFound(format!("collection {id}")))
            }
        }
    }
}

/// Link a game to facet targets. Ids with no target row are skipped.
fn insert_facet_ids(
    conn: &Connection,
    facet: FacetKind,
    game_id: i64,
    ids: &[i64],
) -> Result<(), CatalogError> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (game_id, {}) SELECT ?1, id FROM {} WHERE id = ?2",
        facet.join_table(),
        facet.target_column(),
        facet.entity().table(),
    );
    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    for id in ids {
        stmt.execute(params![game_id, id]).map_err(db_err)?;
    }
    Ok(())
}

fn insert_company_link(
    conn: &Connection,
    game_id: i64,
    link: &CompanyRoleInput,
) -> Result<(), CatalogError> {
    conn.execute(
        "INSERT OR REPLACE INTO game_companies
             (game_id, company_id, developer, publisher, porting, supporting)
         SELECT ?1, id, ?3, ?4, ?5, ?6 FROM companies WHERE id = ?2",
        params![
            game_id,
            link.company_id,
            link.roles.developer,
            link.roles.publisher,
            link.roles.porting,
            link.roles.supporting,
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

fn load_facet(
    conn: &Connection,
    facet: FacetKind,
    game_id: i64,
) -> Result<Vec<NamedEntity>, CatalogError> {
    let sql = format!(
        "SELECT e.id, e.name FROM {join} j JOIN {table} e ON e.id = j.{col}
         WHERE j.game_id = ? ORDER BY fold(e.name) ASC, e.id ASC",
        join = facet.join_table(),
        table = facet.entity().table(),
        col = facet.target_column(),
    );
    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt.query_map(params![game_id], row_to_named).map_err(db_err)?;

    let mut entities = Vec::new();
    for row in rows {
        entities.push(row.map_err(db_err)?);
    }
    Ok(entities)
}

fn load_companies(conn: &Connection, game_id: i64) -> Result<Vec<CompanyLink>, CatalogError> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.name, j.developer, j.publisher, j.porting, j.supporting
             FROM game_companies j JOIN companies c ON c.id = j.company_id
             WHERE j.game_id = ? ORDER BY fold(c.name) ASC, c.id ASC",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map(params![game_id], |row| {
            Ok(CompanyLink {
                company_id: row.get(0)?,
                name: row.get(1)?,
                roles: CompanyRoles {
                    developer: row.get(2)?,
                    publisher: row.get(3)?,
                    porting: row.get(4)?,
                    supporting: row.get(5)?,
                },
            })
        })
        .map_err(db_err)?;

    let mut links = Vec::new();
    for row in rows {
        links.push(row.map_err(db_err)?);
    }
    Ok(links)
}
