//! SQLite read side for stats.

use std::collections::HashMap;

use rusqlite::{params, Connection};

use super::{GameRow, StatsError, StatsSource};
use crate::catalog::{db_err, CatalogError, CompanyRoles, EntityKind, SqliteCatalog};
use crate::location::find_default_location_in;

/// Read `(game_id, value)` pairs and hand each to `apply` on the matching row.
fn attach<T: rusqlite::types::FromSql>(
    conn: &Connection,
    sql: &str,
    rows: &mut [GameRow],
    index: &HashMap<i64, usize>,
    mut apply: impl FnMut(&mut GameRow, T),
) -> Result<(), CatalogError> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let pairs = stmt
        .query_map(params![], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, T>(1)?)))
        .map_err(db_err)?;

    for pair in pairs {
        let (game_id, value) = pair.map_err(db_err)?;
        if let Some(&i) = index.get(&game_id) {
            apply(&mut rows[i], value);
        }
    }
    Ok(())
}

fn load_rows_in(conn: &Connection) -> Result<Vec<GameRow>, CatalogError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, COALESCE(igdb_id, 0), name, release_year, cover_url, rating, location_id
             FROM games ORDER BY id",
        )
        .map_err(db_err)?;
    let mapped = stmt
        .query_map(params![], |row| {
            Ok(GameRow {
                id: row.get(0)?,
                igdb_id: row.get(1)?,
                name: row.get(2)?,
                release_year: row.get(3)?,
                cover_url: row.get(4)?,
                rating: row.get(5)?,
                location_id: row.get(6)?,
                ..Default::default()
            })
        })
        .map_err(db_err)?;

    let mut rows = Vec::new();
    for row in mapped {
        rows.push(row.map_err(db_err)?);
    }
    let index: HashMap<i64, usize> = rows.iter().enumerate().map(|(i, r)| (r.id, i)).collect();

    attach(
        conn,
        "SELECT game_id, platform_id FROM game_platforms ORDER BY game_id, platform_id",
        &mut rows,
        &index,
        |row, id: i64| row.platform_ids.push(id),
    )?;
    attach(
        conn,
        "SELECT game_id, genre_id FROM game_genres ORDER BY game_id, genre_id",
        &mut rows,
        &index,
        |row, id: i64| row.genre_ids.push(id),
    )?;
    attach(
        conn,
        "SELECT game_id, COUNT(*) FROM game_tags GROUP BY game_id",
        &mut rows,
        &index,
        |row, count: i64| row.tag_count = count as usize,
    )?;

    let mut stmt = conn
        .prepare(
            "SELECT game_id, company_id, developer, publisher, porting, supporting
             FROM game_companies ORDER BY game_id, company_id",
        )
        .map_err(db_err)?;
    let links = stmt
        .query_map(params![], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                CompanyRoles {
                    developer: row.get(2)?,
                    publisher: row.get(3)?,
                    porting: row.get(4)?,
                    supporting: row.get(5)?,
                },
            ))
        })
        .map_err(db_err)?;
    for link in links {
        let (game_id, company_id, roles) = link.map_err(db_err)?;
        if let Some(&i) = index.get(&game_id) {
            rows[i].companies.push((company_id, roles));
        }
    }

    Ok(rows)
}

impl StatsSource for SqliteCatalog {
    fn load_game_rows(&self) -> Result<Vec<GameRow>, StatsError> {
        let conn = self.conn()?;
        Ok(load_rows_in(&conn)?)
    }

    fn entity_names(&self, kind: EntityKind) -> Result<HashMap<i64, String>, StatsError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT id, name FROM {}", kind.table()))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(db_err)?;

        let mut names = HashMap::new();
        for row in rows {
            let (id, name) = row.map_err(db_err)?;
            names.insert(id, name);
        }
        Ok(names)
    }

    fn default_location(&self) -> Result<Option<i64>, StatsError> {
        let conn = self.conn()?;
        Ok(find_default_location_in(
            &conn,
            &self.locations_config().default_name,
        )?)
    }
}
