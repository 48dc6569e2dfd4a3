//! Hand-driven clock for TTL tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::stats::Clock;

/// A [`Clock`] that only moves when told to.
///
/// # Example
///
/// ```rust,ignore
/// use gamecubby_core::testing::ManualClock;
///
/// let clock = Arc::new(ManualClock::default());
/// let cache = StatsCache::with_clock(Duration::seconds(300), clock.clone());
///
/// clock.advance(Duration::seconds(301));
/// // everything cached before the advance is now stale
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move forward (or backward, with a negative delta).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
