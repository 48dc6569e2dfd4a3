//! In-memory stats source for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::catalog::{CatalogError, EntityKind};
use crate::stats::{GameRow, StatsError, StatsSource};

/// A [`StatsSource`] serving whatever rows it was last given.
///
/// Provides controllable behavior for testing:
/// - Swap the row set between reads
/// - Count how often rows were loaded (one load per recompute)
/// - Fail every read while the failing flag is set
#[derive(Debug, Default)]
pub struct StaticStatsSource {
    rows: Mutex<Vec<GameRow>>,
    names: Mutex<HashMap<EntityKind, HashMap<i64, String>>>,
    default_location: Mutex<Option<i64>>,
    failing: AtomicBool,
    loads: AtomicUsize,
}

impl StaticStatsSource {
    pub fn new(rows: Vec<GameRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn set_rows(&self, rows: Vec<GameRow>) {
        *self.rows.lock().unwrap_or_else(|e| e.into_inner()) = rows;
    }

    pub fn set_names<'a>(&self, kind: EntityKind, names: impl IntoIterator<Item = (i64, &'a str)>) {
        let names = names
            .into_iter()
            .map(|(id, name)| (id, name.to_string()))
            .collect();
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, names);
    }

    pub fn set_default_location(&self, id: Option<i64>) {
        *self
            .default_location
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = id;
    }

    /// Make every read fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful row loads so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StatsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Database("simulated read failure".to_string()).into());
        }
        Ok(())
    }
}

impl StatsSource for StaticStatsSource {
    fn load_game_rows(&self) -> Result<Vec<GameRow>, StatsError> {
        self.check()?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn entity_names(&self, kind: EntityKind) -> Result<HashMap<i64, String>, StatsError> {
        self.check()?;
        Ok(self
            .names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    fn default_location(&self) -> Result<Option<i64>, StatsError> {
        self.check()?;
        Ok(*self
            .default_location
            .lock()
            .unwrap_or_else(|e| e.into_inner()))
    }
}
