//! SQLite-backed game search.

use rusqlite::{params, Connection};
use tracing::debug;

use super::filter::{FacetFilter, GameFilter, ManualFilter, MatchMode, YearFilter};
use super::{suggestion_query, GameSearch, SearchError, SUGGESTION_LIMIT};
use crate::catalog::{
    db_err, row_to_game, CatalogError, EntityKind, FacetKind, Game, NamedEntity, SqliteCatalog,
    GAME_COLUMNS,
};
use crate::location::{descendant_ids_in, load_tree_in};
use crate::metrics::SEARCH_RESULTS;

type SqlParams = Vec<Box<dyn rusqlite::ToSql>>;

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Condition for one facet, or `None` when the facet constrains nothing.
fn facet_condition(facet: FacetKind, filter: &FacetFilter, params: &mut SqlParams) -> Option<String> {
    let join = facet.join_table();
    let col = facet.target_column();
    let related = format!("SELECT 1 FROM {join} j WHERE j.game_id = g.id");

    if filter.ids.is_empty() {
        return match filter.mode {
            MatchMode::Any | MatchMode::All => None,
            MatchMode::Exact => Some(format!("NOT EXISTS ({related})")),
        };
    }

    let mut parts = Vec::new();
    match filter.mode {
        MatchMode::Any => {
            parts.push(format!(
                "EXISTS ({related} AND j.{col} IN ({}))",
                placeholders(filter.ids.len())
            ));
            params.extend(filter.ids.iter().map(|id| Box::new(*id) as Box<dyn rusqlite::ToSql>));
        }
        MatchMode::All | MatchMode::Exact => {
            for id in &filter.ids {
                parts.push(format!("EXISTS ({related} AND j.{col} = ?)"));
                params.push(Box::new(*id));
            }
            if filter.mode == MatchMode::Exact {
                parts.push(format!(
                    "NOT EXISTS ({related} AND j.{col} NOT IN ({}))",
                    placeholders(filter.ids.len())
                ));
                params.extend(filter.ids.iter().map(|id| Box::new(*id) as Box<dyn rusqlite::ToSql>));
            }
        }
    }

    Some(parts.join(" AND "))
}

/// Build the WHERE clause. `location_ids` is the already-expanded location set.
fn build_where_clause(filter: &GameFilter, location_ids: Option<&[i64]>) -> (String, SqlParams) {
    let mut conditions = Vec::new();
    let mut params: SqlParams = Vec::new();

    if let Some(ref name) = filter.name {
        conditions.push("instr(fold(g.name), fold(?)) > 0".to_string());
        params.push(Box::new(name.clone()));
    }

    match filter.year {
        Some(YearFilter::Exact(year)) => {
            conditions.push("g.release_year = ?".to_string());
            params.push(Box::new(year));
        }
        Some(YearFilter::Range { min, max }) => {
            if let Some(min) = min {
                conditions.push("g.release_year >= ?".to_string());
                params.push(Box::new(min));
            }
            if let Some(max) = max {
                conditions.push("g.release_year <= ?".to_string());
                params.push(Box::new(max));
            }
        }
        None => {}
    }

    for (facet, facet_filter) in &filter.facets {
        if let Some(condition) = facet_condition(*facet, facet_filter, &mut params) {
            conditions.push(condition);
        }
    }

    if let Some(collection_id) = filter.collection_id {
        conditions.push("g.collection_id = ?".to_string());
        params.push(Box::new(collection_id));
    }

    if let Some(ids) = location_ids {
        conditions.push(format!("g.location_id IN ({})", placeholders(ids.len())));
        params.extend(ids.iter().map(|id| Box::new(*id) as Box<dyn rusqlite::ToSql>));
    }

    match filter.manual {
        ManualFilter::Include => {}
        ManualFilter::Exclude => conditions.push("COALESCE(g.igdb_id, 0) != 0".to_string()),
        ManualFilter::Only => conditions.push("COALESCE(g.igdb_id, 0) = 0".to_string()),
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, params)
}

fn suggest_from(
    conn: &Connection,
    table: &str,
    q: &str,
) -> Result<Vec<NamedEntity>, CatalogError> {
    let sql = format!(
        "SELECT id, name FROM {table} WHERE instr(fold(name), fold(?1)) > 0
         ORDER BY fold(name) ASC, id ASC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params![q, SUGGESTION_LIMIT as i64], |row| {
            Ok(NamedEntity {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .map_err(db_err)?;

    let mut entities = Vec::new();
    for row in rows {
        entities.push(row.map_err(db_err)?);
    }
    Ok(entities)
}

impl GameSearch for SqliteCatalog {
    fn search_games(&self, filter: &GameFilter) -> Result<Vec<Game>, SearchError> {
        let conn = self.conn()?;
        let max_depth = self.locations_config().max_depth;

        let location_ids = match filter.location {
            Some(location) => {
                let mut ids = vec![location.id];
                if location.include_descendants {
                    ids.extend(descendant_ids_in(&conn, location.id, max_depth)?);
                }
                Some(ids)
            }
            None => None,
        };

        let (where_clause, mut params) = build_where_clause(filter, location_ids.as_deref());

        let mut sql = format!(
            "SELECT {GAME_COLUMNS} FROM games g {where_clause} ORDER BY fold(g.name) ASC, g.id ASC"
        );
        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                params.push(Box::new(limit));
                params.push(Box::new(offset.unwrap_or(0)));
            }
            (None, Some(offset)) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Box::new(offset));
            }
            (None, None) => {}
        }

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_game)
            .map_err(db_err)?;

        let mut games = Vec::new();
        for row in rows {
            games.push(row.map_err(db_err)?);
        }

        // One snapshot decorates every result
        if games.iter().any(|g| g.location_id.is_some()) {
            let tree = load_tree_in(&conn, max_depth)?;
            for game in &mut games {
                if let Some(location_id) = game.location_id {
                    game.location_path = tree.path(location_id);
                }
            }
        }

        SEARCH_RESULTS.with_label_values(&[]).observe(games.len() as f64);
        debug!(
            results = games.len(),
            facets = filter.facets.len(),
            "Game search completed"
        );
        Ok(games)
    }

    fn suggest_names(&self, q: &str) -> Result<Vec<String>, SearchError> {
        let q = suggestion_query(q)?;
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT name FROM games WHERE instr(fold(name), fold(?1)) > 0
                 ORDER BY fold(name) ASC, id ASC LIMIT ?2",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![q, SUGGESTION_LIMIT as i64], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(db_err)?);
        }
        Ok(names)
    }

    fn suggest_entities(
        &self,
        kind: EntityKind,
        q: &str,
    ) -> Result<Vec<NamedEntity>, SearchError> {
        let q = suggestion_query(q)?;
        let conn = self.conn()?;
        Ok(suggest_from(&conn, kind.table(), q)?)
    }
}
