//! Named-bucket TTL cache for computed stats payloads.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::metrics::{STATS_CACHE_HITS, STATS_CACHE_MISSES};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cache buckets. `HealthDetails` shares the lifetime of `Health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBucket {
    Overview,
    Health,
    HealthDetails,
}

impl CacheBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBucket::Overview => "overview",
            CacheBucket::Health => "health",
            CacheBucket::HealthDetails => "health_details",
        }
    }
}

/// A cached payload with the time it was computed.
#[derive(Debug)]
pub struct Cached<T> {
    pub payload: Arc<T>,
    pub computed_at: DateTime<Utc>,
}

impl<T> Clone for Cached<T> {
    fn clone(&self) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            computed_at: self.computed_at,
        }
    }
}

/// Serializes as the payload's fields plus `computed_at`.
impl<T: Serialize> Serialize for Cached<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a, T> {
            #[serde(flatten)]
            stats: &'a T,
            computed_at: DateTime<Utc>,
        }

        View {
            stats: self.payload.as_ref(),
            computed_at: self.computed_at,
        }
        .serialize(serializer)
    }
}

struct Entry {
    computed_at: DateTime<Utc>,
    payload: Arc<dyn Any + Send + Sync>,
}

/// Whole-payload cache with a fixed time-to-live.
///
/// Entries are replaced, never patched. An entry is fresh while
/// `now - computed_at <= ttl`.
pub struct StatsCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheBucket, Entry>>,
}

impl std::fmt::Debug for StatsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCache")
            .field("ttl", &self.ttl)
            .field("clock", &"<clock>")
            .field("entries", &"<entries>")
            .finish()
    }
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheBucket, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh payload of `bucket`, if any. Counts a hit or a miss.
    pub fn get<T: Any + Send + Sync>(&self, bucket: CacheBucket) -> Option<Cached<T>> {
        let hit = self.peek(bucket);
        match hit {
            Some(_) => STATS_CACHE_HITS.with_label_values(&[bucket.as_str()]).inc(),
            None => {
                STATS_CACHE_MISSES
                    .with_label_values(&[bucket.as_str()])
                    .inc();
                debug!(bucket = bucket.as_str(), "Stats cache miss");
            }
        }
        hit
    }

    /// Like [`get`](Self::get) without touching the hit/miss counters.
    pub fn peek<T: Any + Send + Sync>(&self, bucket: CacheBucket) -> Option<Cached<T>> {
        let now = self.clock.now();
        let entries = self.entries();

        entries.get(&bucket).and_then(|entry| {
            if now.signed_duration_since(entry.computed_at) > self.ttl {
                return None;
            }
            let payload = Arc::clone(&entry.payload).downcast::<T>().ok()?;
            Some(Cached {
                payload,
                computed_at: entry.computed_at,
            })
        })
    }

    /// Replace the payload of `bucket`, stamped with `computed_at`.
    pub fn put<T: Any + Send + Sync>(
        &self,
        bucket: CacheBucket,
        payload: T,
        computed_at: DateTime<Utc>,
    ) -> Cached<T> {
        let payload = Arc::new(payload);
        self.entries().insert(
            bucket,
            Entry {
                computed_at,
                payload: payload.clone(),
            },
        );
        Cached {
            payload,
            computed_at,
        }
    }

    /// Drop a bucket. Invalidating `Health` also drops its detail ids.
    pub fn invalidate(&self, bucket: CacheBucket) {
        let mut entries = self.entries();
        entries.remove(&bucket);
        if bucket == CacheBucket::Health {
            entries.remove(&CacheBucket::HealthDetails);
        }
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
