//! In-process cache backend.

use super::CacheBackend;
use crate::{CacheResult, KeyPattern};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use shopfront_config::CacheBackendKind;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Upper bound for expiry instants when `now + ttl` overflows.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Entries plus a registry of their keys.
///
/// `DashMap` offers no prefix scan, so pattern removal walks the registry.
/// The registry is only touched while the map entry for the same key is
/// locked, map first, which keeps the two in step for every key.
#[derive(Default)]
struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
    keys: DashSet<String>,
}

impl MemoryStore {
    fn insert(&self, key: &str, value: &str, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value: value.to_owned(),
            expires_at: now.checked_add(ttl).unwrap_or(now + MAX_TTL),
        };

        let slot = self.entries.entry(key.to_owned());
        self.keys.insert(key.to_owned());
        slot.insert(entry);
    }

    /// Removes `key` if its entry satisfies `predicate`.
    fn evict_if(&self, key: &str, predicate: impl FnOnce(&CacheEntry) -> bool) -> bool {
        if let Entry::Occupied(occupied) = self.entries.entry(key.to_owned()) {
            if predicate(occupied.get()) {
                self.keys.remove(key);
                occupied.remove();
                return true;
            }
        }
        false
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        self.evict_if(key, |entry| entry.is_expired(now));
        None
    }

    /// Point-in-time copy of the registry, filtered by `pattern`.
    fn matching_keys(&self, pattern: &KeyPattern) -> Vec<String> {
        self.keys
            .iter()
            .filter(|key| pattern.matches(key.key()))
            .map(|key| key.key().clone())
            .collect()
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.entries.retain(|key, entry| {
            if entry.is_expired(now) {
                self.keys.remove(key);
                purged += 1;
                false
            } else {
                true
            }
        });
        purged
    }

    fn clear(&self) {
        self.entries.retain(|key, _| {
            self.keys.remove(key);
            false
        });
    }
}

/// In-process backend built on concurrent hash maps.
///
/// Expired entries are evicted lazily on access and periodically by
/// [`MemoryBackend::spawn_sweeper`]. Cloning shares the same store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<MemoryStore>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.entries.is_empty()
    }

    /// Evict every expired entry now. Returns the number evicted.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Start a background task that calls [`purge_expired`](Self::purge_expired)
    /// every `period`.
    ///
    /// The task holds only a weak reference and stops once every clone of
    /// this backend has been dropped. Must be called inside a Tokio runtime.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let weak: Weak<MemoryStore> = Arc::downgrade(&self.store);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "Swept expired cache entries");
                }
            }

            debug!("Cache sweeper stopped");
        })
    }

    #[cfg(test)]
    fn registry_len(&self) -> usize {
        self.store.keys.len()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.store.entries.len())
            .finish()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn kind(&self) -> CacheBackendKind {
        CacheBackendKind::InMemory
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.store.lookup(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.store.insert(key, value, ttl);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let mut live = false;
        let removed = self.store.evict_if(key, |entry| {
            live = !entry.is_expired(now);
            true
        });
        Ok(removed && live)
    }

    async fn remove_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool> {
        Ok(self.store.evict_if(key, |entry| entry.value == expected))
    }

    async fn remove_by_pattern(&self, pattern: &KeyPattern) -> CacheResult<u64> {
        let removed = match pattern {
            KeyPattern::Exact(key) => u64::from(self.store.evict_if(key, |_| true)),
            KeyPattern::Prefix(_) => {
                let mut removed = 0u64;
                for key in self.store.matching_keys(pattern) {
                    if self.store.evict_if(&key, |_| true) {
                        removed += 1;
                    }
                }
                removed
            }
        };

        debug!(%pattern, removed, "Removed in-memory keys by pattern");
        Ok(removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.store.clear();
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.store.lookup(key).is_some())
    }
}
