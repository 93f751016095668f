//! Bounded, time-boxed memo of selection outcomes.
//!
//! Keys are source strings used verbatim. Entries expire after a fixed
//! TTL and the table never holds more than `max_entries`; overflow evicts
//! the oldest-inserted entry (insertion order, not access order).
//!
//! Uses `tokio::time::Instant`, so tests can drive expiry with a paused
//! clock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::types::{BackendId, Confidence, ContentTypeInfo};

/// Default time-to-live (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
/// Default capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// A cached selection outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub backend: BackendId,
    pub can_play: bool,
    pub confidence: Confidence,
    pub content_type: Option<ContentTypeInfo>,
    /// Insertion time; overwritten by [`ResultCache::set`].
    pub timestamp: Instant,
}

impl CacheEntry {
    pub fn new(
        backend: BackendId,
        can_play: bool,
        confidence: Confidence,
        content_type: Option<ContentTypeInfo>,
    ) -> Self {
        Self {
            backend,
            can_play,
            confidence,
            content_type,
            timestamp: Instant::now(),
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.timestamp) >= ttl
    }
}

/// Snapshot returned by [`ResultCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    #[serde(rename = "ttl_ms")]
    #[serde(serialize_with = "serialize_millis")]
    pub ttl: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

#[derive(Default)]
struct CacheTable {
    entries: HashMap<String, CacheEntry>,
    /// Keys oldest-first.
    order: VecDeque<String>,
}

impl CacheTable {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(removed)
    }
}

/// Shared selection cache. Every operation takes the lock once, so
/// concurrent callers never see a partial update.
pub struct ResultCache {
    table: Mutex<CacheTable>,
    ttl: Duration,
    max_entries: usize,
}

impl ResultCache {
    /// Cache with the default TTL and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }

    /// Cache with an explicit TTL and capacity (capacity is at least 1).
    #[must_use]
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            table: Mutex::new(CacheTable::default()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a source. Expired entries are removed and reported absent.
    pub async fn get(&self, source: &str) -> Option<CacheEntry> {
        let mut table = self.table.lock().await;
        let expired = table
            .entries
            .get(source)
            .map(|entry| entry.is_expired(Instant::now(), self.ttl))?;

        if expired {
            table.remove(source);
            debug!(source, "cache entry expired");
            return None;
        }

        table.entries.get(source).cloned()
    }

    /// Store an entry stamped with the current time.
    ///
    /// Re-setting an existing key moves it to the newest position. A new
    /// key inserted at capacity evicts exactly the oldest-inserted entry.
    pub async fn set(&self, source: &str, mut entry: CacheEntry) {
        entry.timestamp = Instant::now();
        let mut table = self.table.lock().await;

        if table.remove(source).is_none() && table.entries.len() >= self.max_entries {
            if let Some(oldest) = table.order.pop_front() {
                table.entries.remove(&oldest);
                debug!(evicted = %oldest, "cache full, evicted oldest entry");
            }
        }

        table.order.push_back(source.to_string());
        table.entries.insert(source.to_string(), entry);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut table = self.table.lock().await;
        let before = table.entries.len();

        let ttl = self.ttl;
        table.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let CacheTable { entries, order } = &mut *table;
        order.retain(|key| entries.contains_key(key));

        before - table.entries.len()
    }

    pub async fn clear(&self) {
        let mut table = self.table.lock().await;
        table.entries.clear();
        table.order.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.table.lock().await.entries.len(),
            max_size: self.max_entries,
            ttl: self.ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Spawn a task that sweeps expired entries every `every`.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped. Must be called inside a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep().await;
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

/// Start the sweeper when called from within a tokio runtime. Returns
/// `None` (and leaves expiry to lookups) otherwise.
pub fn spawn_sweeper_if_runtime(cache: &Arc<ResultCache>, every: Duration) -> Option<JoinHandle<()>> {
    if tokio::runtime::Handle::try_current().is_err() {
        debug!("no tokio runtime, cache sweeper not started");
        return None;
    }
    Some(cache.spawn_sweeper(every))
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
