//! SQLite-backed location store.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{DeleteOutcome, LocationError, LocationStore, LocationTree};
use crate::catalog::{
    db_err, fetch_game, row_exists, CatalogError, Location, LocationPathEntry, NamedEntity,
    SqliteCatalog,
};
use crate::metrics::LOCATION_GAMES_MIGRATED;

const LOCATION_COLUMNS: &str = "id, name, parent_id, type";

fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        kind: row.get(3)?,
    })
}

fn query_locations(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Location>, CatalogError> {
    let sql = format!(
        "SELECT {LOCATION_COLUMNS} FROM locations {where_clause} ORDER BY fold(name) ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt.query_map(params, row_to_location).map_err(db_err)?;

    let mut locations = Vec::new();
    for row in rows {
        locations.push(row.map_err(db_err)?);
    }
    Ok(locations)
}

fn fetch_location(conn: &Connection, id: i64) -> Result<Option<Location>, CatalogError> {
    conn.query_row(
        &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?"),
        params![id],
        row_to_location,
    )
    .optional()
    .map_err(db_err)
}

/// Snapshot every location in one read.
pub(crate) fn load_tree_in(conn: &Connection, max_depth: usize) -> Result<LocationTree, CatalogError> {
    let mut stmt = conn
        .prepare("SELECT id, parent_id, name FROM locations")
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .map_err(db_err)?;

    let mut snapshot = Vec::new();
    for row in rows {
        snapshot.push(row.map_err(db_err)?);
    }
    Ok(LocationTree::from_rows(snapshot, max_depth))
}

pub(crate) fn location_path_in(
    conn: &Connection,
    id: i64,
    max_depth: usize,
) -> Result<Vec<LocationPathEntry>, CatalogError> {
    Ok(load_tree_in(conn, max_depth)?.path(id))
}

pub(crate) fn descendant_ids_in(
    conn: &Connection,
    root_id: i64,
    max_depth: usize,
) -> Result<Vec<i64>, CatalogError> {
    Ok(load_tree_in(conn, max_depth)?.descendants(root_id))
}

/// Look up the default root location by name.
pub(crate) fn find_default_location_in(
    conn: &Connection,
    name: &str,
) -> Result<Option<i64>, CatalogError> {
    conn.query_row(
        "SELECT id FROM locations WHERE name = ? AND parent_id IS NULL ORDER BY id LIMIT 1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .map_err(db_err)
}

/// Look up the default root location, creating it on first use.
pub(crate) fn ensure_default_location_in(conn: &Connection, name: &str) -> Result<i64, CatalogError> {
    if let Some(id) = find_default_location_in(conn, name)? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO locations (name, parent_id, type) VALUES (?, NULL, NULL)",
        params![name],
    )
    .map_err(db_err)?;
    let id = conn.last_insert_rowid();

    info!(location_id = id, name, "Created default location");
    Ok(id)
}

impl LocationStore for SqliteCatalog {
    fn create_location(
        &self,
        name: &str,
        parent_id: Option<i64>,
        kind: Option<&str>,
    ) -> Result<Location, LocationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LocationError::EmptyName);
        }

        let conn = self.conn()?;
        if let Some(parent_id) = parent_id {
            if !row_exists(&conn, "locations", parent_id)? {
                return Err(LocationError::ParentNotFound(parent_id));
            }
        }

        conn.execute(
            "INSERT INTO locations (name, parent_id, type) VALUES (?, ?, ?)",
            params![name, parent_id, kind],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();

        debug!(location_id = id, name, ?parent_id, "Created location");
        Ok(Location {
            id,
            name: name.to_string(),
            parent_id,
            kind: kind.map(str::to_string),
        })
    }

    fn get_location(&self, id: i64) -> Result<Location, LocationError> {
        let conn = self.conn()?;
        fetch_location(&conn, id)?.ok_or(LocationError::NotFound(id))
    }

    fn list_locations(&self) -> Result<Vec<Location>, LocationError> {
        let conn = self.conn()?;
        Ok(query_locations(&conn, "", params![])?)
    }

    fn list_top_locations(&self) -> Result<Vec<Location>, LocationError> {
        let conn = self.conn()?;
        Ok(query_locations(&conn, "WHERE parent_id IS NULL", params![])?)
    }

    fn list_children(&self, parent_id: i64) -> Result<Vec<Location>, LocationError> {
        let conn = self.conn()?;
        Ok(query_locations(&conn, "WHERE parent_id = ?", params![parent_id])?)
    }

    fn location_path(&self, id: i64) -> Result<Vec<LocationPathEntry>, LocationError> {
        let conn = self.conn()?;
        let tree = load_tree_in(&conn, self.locations_config().max_depth)?;
        if !tree.contains(id) {
            return Err(LocationError::NotFound(id));
        }
        Ok(tree.path(id))
    }

    fn game_location_path(&self, game_id: i64) -> Result<Vec<LocationPathEntry>, LocationError> {
        let conn = self.conn()?;
        let game = fetch_game(&conn, game_id)?.ok_or(LocationError::GameNotFound(game_id))?;

        match game.location_id {
            Some(location_id) => Ok(location_path_in(
                &conn,
                location_id,
                self.locations_config().max_depth,
            )?),
            None => Ok(Vec::new()),
        }
    }

    fn descendant_ids(&self, root_id: i64) -> Result<Vec<i64>, LocationError> {
        let conn = self.conn()?;
        Ok(descendant_ids_in(
            &conn,
            root_id,
            self.locations_config().max_depth,
        )?)
    }

    fn delete_location(&self, id: i64) -> Result<DeleteOutcome, LocationError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        if !row_exists(&tx, "locations", id)? {
            return Ok(DeleteOutcome::NotFound);
        }

        let children: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM locations WHERE parent_id = ?",
                params![id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if children > 0 {
            debug!(location_id = id, children, "Location delete blocked by children");
            return Ok(DeleteOutcome::HasChildren { children });
        }

        let games: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM games WHERE location_id = ?",
                params![id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if games > 0 {
            debug!(location_id = id, games, "Location delete blocked by games");
            return Ok(DeleteOutcome::HasGames { games });
        }

        tx.execute("DELETE FROM locations WHERE id = ?", params![id])
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        info!(location_id = id, "Deleted location");
        Ok(DeleteOutcome::Deleted)
    }

    fn rename_location(&self, id: i64, name: &str) -> Result<Location, LocationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LocationError::EmptyName);
        }

        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE locations SET name = ? WHERE id = ?",
                params![name, id],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(LocationError::NotFound(id));
        }

        info!(location_id = id, name, "Renamed location");
        fetch_location(&conn, id)?.ok_or(LocationError::NotFound(id))
    }

    fn migrate_games(&self, from_id: i64, to_id: i64) -> Result<usize, LocationError> {
        if from_id == to_id {
            return Err(LocationError::SameLocation);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        if !row_exists(&tx, "locations", to_id)? {
            return Err(LocationError::TargetNotFound(to_id));
        }

        let migrated = tx
            .execute(
                "UPDATE games SET location_id = ? WHERE location_id = ?",
                params![to_id, from_id],
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        LOCATION_GAMES_MIGRATED.inc_by(migrated as u64);
        info!(from_id, to_id, migrated, "Migrated games between locations");
        Ok(migrated)
    }

    fn default_location_id(&self) -> Result<Option<i64>, LocationError> {
        let conn = self.conn()?;
        Ok(find_default_location_in(
            &conn,
            &self.locations_config().default_name,
        )?)
    }

    fn ensure_default_location(&self) -> Result<i64, LocationError> {
        let conn = self.conn()?;
        Ok(ensure_default_location_in(
            &conn,
            &self.locations_config().default_name,
        )?)
    }

    fn list_games_at(&self, location_id: i64) -> Result<Vec<NamedEntity>, LocationError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name FROM games WHERE location_id = ?
                 ORDER BY fold(name) ASC, id ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![location_id], |row| {
                Ok(NamedEntity {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(db_err)?;

        let mut games = Vec::new();
        for row in rows {
            games.push(row.map_err(db_err)?);
        }
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GameCatalog, NewGame};
    use crate::config::LocationsConfig;

    fn catalog() -> SqliteCatalog {
        SqliteCatalog::in_memory().unwrap()
    }

    /// Root(1) -> Shelf(2) -> Box(3)
    fn shelf_chain(catalog: &SqliteCatalog) -> (Location, Location, Location) {
        let root = catalog.create_location("Root", None, Some("room")).unwrap();
        let shelf = catalog.create_location("Shelf", Some(root.id), Some("shelf")).unwrap();
        let bx = catalog.create_location("Box", Some(shelf.id), Some("box")).unwrap();
        (root, shelf, bx)
    }

    fn game_at(catalog: &SqliteCatalog, name: &str, location_id: i64) -> i64 {
        catalog
            .create_game(&NewGame {
                location_id: Some(location_id),
                ..NewGame::named(name)
            })
            .unwrap()
            .game
            .id
    }

    #[test]
    fn test_game_location_path_is_root_first() {
        let catalog = catalog();
        let (root, shelf, bx) = shelf_chain(&catalog);
        let game_id = game_at(&catalog, "Earthbound", bx.id);

        let path = catalog.game_location_path(game_id).unwrap();
        assert_eq!(
            path,
            vec![
                LocationPathEntry { id: root.id, name: "Root".to_string() },
                LocationPathEntry { id: shelf.id, name: "Shelf".to_string() },
                LocationPathEntry { id: bx.id, name: "Box".to_string() },
            ]
        );

        assert!(matches!(
            catalog.game_location_path(999),
            Err(LocationError::GameNotFound(999))
        ));
    }

    #[test]
    fn test_game_without_location_has_empty_path() {
        let catalog = catalog();
        let game_id = game_at(&catalog, "Orphan", catalog.ensure_default_location().unwrap());
        {
            let conn = catalog.conn().unwrap();
            conn.execute("UPDATE games SET location_id = NULL WHERE id = ?", params![game_id])
                .unwrap();
        }
        assert!(catalog.game_location_path(game_id).unwrap().is_empty());
    }

    #[test]
    fn test_descendants_of_root() {
        let catalog = catalog();
        let (root, shelf, bx) = shelf_chain(&catalog);

        assert_eq!(catalog.descendant_ids(root.id).unwrap(), vec![shelf.id, bx.id]);
        assert_eq!(catalog.descendant_ids(bx.id).unwrap(), Vec::<i64>::new());
        assert_eq!(catalog.descendant_ids(12345).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_create_location_requires_parent_and_name() {
        let catalog = catalog();
        assert!(matches!(
            catalog.create_location("Drawer", Some(77), None),
            Err(LocationError::ParentNotFound(77))
        ));
        assert!(matches!(
            catalog.create_location("  ", None, None),
            Err(LocationError::EmptyName)
        ));
    }

    #[test]
    fn test_delete_blocked_by_children_then_succeeds() {
        let catalog = catalog();
        let (_root, shelf, bx) = shelf_chain(&catalog);

        assert_eq!(
            catalog.delete_location(shelf.id).unwrap(),
            DeleteOutcome::HasChildren { children: 1 }
        );
        assert_eq!(catalog.delete_location(bx.id).unwrap(), DeleteOutcome::Deleted);
        assert_eq!(catalog.delete_location(shelf.id).unwrap(), DeleteOutcome::Deleted);

        assert!(matches!(
            catalog.get_location(shelf.id),
            Err(LocationError::NotFound(_))
        ));
        assert_eq!(catalog.delete_location(shelf.id).unwrap(), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_delete_blocked_by_games() {
        let catalog = catalog();
        let (_root, _shelf, bx) = shelf_chain(&catalog);
        game_at(&catalog, "Mother 3", bx.id);

        let outcome = catalog.delete_location(bx.id).unwrap();
        assert_eq!(outcome, DeleteOutcome::HasGames { games: 1 });
        assert!(outcome.reason().unwrap().contains("1 game"));
        assert!(catalog.get_location(bx.id).is_ok());
    }

    #[test]
    fn test_rename_trims_and_rejects_blank() {
        let catalog = catalog();
        let (root, _, _) = shelf_chain(&catalog);

        let renamed = catalog.rename_location(root.id, "  Living Room ").unwrap();
        assert_eq!(renamed.name, "Living Room");
        assert_eq!(renamed.kind.as_deref(), Some("room"));

        assert!(matches!(
            catalog.rename_location(root.id, "\t"),
            Err(LocationError::EmptyName)
        ));
        assert!(matches!(
            catalog.rename_location(404, "Nowhere"),
            Err(LocationError::NotFound(404))
        ));
    }

    #[test]
    fn test_migrate_moves_games_then_is_noop() {
        let catalog = catalog();
        let from = catalog.create_location("Old Shelf", None, None).unwrap();
        let to = catalog.create_location("New Shelf", None, None).unwrap();
        for name in ["A", "B", "C"] {
            game_at(&catalog, name, from.id);
        }

        assert_eq!(catalog.migrate_games(from.id, to.id).unwrap(), 3);
        assert_eq!(catalog.migrate_games(from.id, to.id).unwrap(), 0);
        assert_eq!(catalog.list_games_at(to.id).unwrap().len(), 3);

        // A source that never existed is a no-op too
        assert_eq!(catalog.migrate_games(9999, to.id).unwrap(), 0);
    }

    #[test]
    fn test_migrate_rejects_same_and_missing_target() {
        let catalog = catalog();
        let loc = catalog.create_location("Shelf", None, None).unwrap();

        assert!(matches!(
            catalog.migrate_games(loc.id, loc.id),
            Err(LocationError::SameLocation)
        ));
        assert!(matches!(
            catalog.migrate_games(loc.id, 500),
            Err(LocationError::TargetNotFound(500))
        ));
    }

    #[test]
    fn test_listing_orders_by_name() {
        let catalog = catalog();
        let attic = catalog.create_location("attic", None, None).unwrap();
        catalog.create_location("Basement", None, None).unwrap();
        catalog.create_location("top shelf", Some(attic.id), None).unwrap();
        catalog.create_location("Bottom shelf", Some(attic.id), None).unwrap();

        let top: Vec<String> = catalog
            .list_top_locations()
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(top, vec!["attic", "Basement"]);

        let children: Vec<String> = catalog
            .list_children(attic.id)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(children, vec!["Bottom shelf", "top shelf"]);

        assert_eq!(catalog.list_locations().unwrap().len(), 4);
    }

    #[test]
    fn test_list_games_at_orders_case_insensitively() {
        let catalog = catalog();
        let shelf = catalog.create_location("Shelf", None, None).unwrap();
        game_at(&catalog, "zelda", shelf.id);
        game_at(&catalog, "Animal Crossing", shelf.id);
        game_at(&catalog, "metroid", shelf.id);

        let names: Vec<String> = catalog
            .list_games_at(shelf.id)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Animal Crossing", "metroid", "zelda"]);
    }

    #[test]
    fn test_default_location_uses_configured_name() {
        let catalog = SqliteCatalog::in_memory()
            .unwrap()
            .with_locations(LocationsConfig {
                default_name: "Unsorted".to_string(),
                ..Default::default()
            });

        assert_eq!(catalog.default_location_id().unwrap(), None);
        let id = catalog.ensure_default_location().unwrap();
        assert_eq!(catalog.ensure_default_location().unwrap(), id);
        assert_eq!(catalog.get_location(id).unwrap().name, "Unsorted");
        assert_eq!(catalog.default_location_id().unwrap(), Some(id));
    }

    #[test]
    fn test_location_path_for_unknown_location() {
        assert!(matches!(
            catalog().location_path(3),
            Err(LocationError::NotFound(3))
        ));
    }
}
