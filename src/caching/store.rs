//! # TTL Cache Store
//!
//! A typed in-memory cache with per-entry TTL, a tag index for bulk
//! invalidation, and automatic cleanup of expired entries.
//!
//! Tags form an explicit secondary index (tag -> set of keys) so that all
//! entries of one account can be dropped without enumerating keys. One tag
//! can cover any number of entries; an entry can carry several tags.
//!
//! Values are replaced whole on every insert: nothing mutates a cached value
//! in place, which keeps concurrent readers working on consistent snapshots.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::debug;

/// A single cache entry: value, expiry and the tags it carries.
#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    expires_at: Instant,
    tags: Vec<String>,
}

impl<T> Entry<T> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache statistics counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired_cleanups: u64,
}

/// TTL-bounded, tag-indexed in-memory cache.
///
/// Built once at process start and injected into the services that share it;
/// dropping the cache aborts its cleanup task.
pub struct TtlCache<T> {
    entries: Arc<DashMap<String, Entry<T>>>,

    /// Secondary index: tag -> keys currently carrying that tag.
    tags: Arc<DashMap<String, HashSet<String>>>,

    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
    expired_cleanups: Arc<AtomicU64>,

    _cleanup_task: tokio::task::JoinHandle<()>,
}

impl<T> Drop for TtlCache<T> {
    fn drop(&mut self) {
        self._cleanup_task.abort();
    }
}

impl<T: Clone + Send + Sync + 'static> TtlCache<T> {
    /// Create a new cache whose cleanup task sweeps expired entries on the
    /// given interval.
    pub fn new(cleanup_interval: Duration) -> Self {
        let entries: Arc<DashMap<String, Entry<T>>> = Arc::new(DashMap::new());
        let tags: Arc<DashMap<String, HashSet<String>>> = Arc::new(DashMap::new());
        let expired_cleanups = Arc::new(AtomicU64::new(0));

        let cleanup_task = {
            let entries = entries.clone();
            let tags = tags.clone();
            let expired_cleanups = expired_cleanups.clone();

            tokio::spawn(async move {
                let mut interval = interval(cleanup_interval);
                loop {
                    interval.tick().await;
                    Self::sweep_expired(&entries, &tags, &expired_cleanups);
                }
            })
        };

        Self {
            entries,
            tags,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
            expired_cleanups,
            _cleanup_task: cleanup_task,
        }
    }

    /// Get a value, treating an expired entry as a miss and evicting it.
    pub fn get(&self, key: &str) -> Option<T> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                drop(entry);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some(entry) => {
                drop(entry);
                if let Some((_, expired)) = self.entries.remove(key) {
                    Self::untag(&self.tags, key, &expired.tags);
                    self.expired_cleanups.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check for an unexpired entry without touching hit/miss counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Insert a value with the given TTL and tags, replacing any previous
    /// entry under the same key.
    pub fn insert(&self, key: &str, value: T, ttl: Duration, tags: &[String]) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
            tags: tags.to_vec(),
        };

        if let Some(old) = self.entries.insert(key.to_string(), entry) {
            Self::untag(&self.tags, key, &old.tags);
        }

        for tag in tags {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Remove a single entry. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        if let Some((_, entry)) = self.entries.remove(key) {
            Self::untag(&self.tags, key, &entry.tags);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove every entry carrying the given tag. Returns the number of
    /// entries removed.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        let keys: Vec<String> = match self.tags.remove(tag) {
            Some((_, keys)) => keys.into_iter().collect(),
            None => return 0,
        };

        let mut removed = 0;
        for key in &keys {
            if let Some((_, entry)) = self.entries.remove(key) {
                // The entry may have carried other tags as well.
                let remaining: Vec<String> =
                    entry.tags.iter().filter(|t| *t != tag).cloned().collect();
                Self::untag(&self.tags, key, &remaining);
                removed += 1;
            }
        }

        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(tag, removed, "removed cache entries by tag");
        }
        removed
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.clear();
        self.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired_cleanups: self.expired_cleanups.load(Ordering::Relaxed),
        }
    }

    /// Drop a key from the index entries of the given tags.
    fn untag(tags: &DashMap<String, HashSet<String>>, key: &str, entry_tags: &[String]) {
        for tag in entry_tags {
            let mut emptied = false;
            if let Some(mut keys) = tags.get_mut(tag) {
                keys.remove(key);
                emptied = keys.is_empty();
            }
            if emptied {
                tags.remove_if(tag, |_, keys| keys.is_empty());
            }
        }
    }

    fn sweep_expired(
        entries: &DashMap<String, Entry<T>>,
        tags: &DashMap<String, HashSet<String>>,
        expired_cleanups: &AtomicU64,
    ) {
        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut cleaned = 0u64;
        for key in expired_keys {
            if let Some((_, entry)) = entries.remove(&key) {
                Self::untag(tags, &key, &entry.tags);
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            expired_cleanups.fetch_add(cleaned, Ordering::Relaxed);
            debug!(cleaned, "swept expired cache entries");
        }
    }
}
