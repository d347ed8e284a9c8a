//! In-memory TTL cache with tag-scoped removal.
//!
//! Entries carry a tag list at write time; `remove_by_tag` evicts every
//! entry under a tag, and the wildcard tag clears the whole cache. Expired
//! entries are swept opportunistically on reads.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tag recognized by [`TaggedCache::remove_by_tag`] as "everything".
pub const WILDCARD_TAG: &str = "*";

struct InternalEntry<T> {
    value: T,
    expires_at: Instant,
    tags: Vec<String>,
}

/// Thread-safe TTL cache with tag-scoped invalidation.
pub struct TaggedCache<T> {
    entries: Arc<RwLock<HashMap<String, InternalEntry<T>>>>,
    cleanup_interval: Duration,
    last_cleanup: Arc<RwLock<Instant>>,
}

impl<T> Clone for TaggedCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            cleanup_interval: self.cleanup_interval,
            last_cleanup: Arc::clone(&self.last_cleanup),
        }
    }
}

impl<T> Default for TaggedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaggedCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cleanup_interval: Duration::from_secs(60),
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
        }
    }

    /// Insert a value with a TTL and its invalidation tags.
    pub fn set(&self, key: &str, value: T, ttl: Duration, tags: &[String]) {
        let internal = InternalEntry {
            value,
            expires_at: Instant::now() + ttl,
            tags: tags.to_vec(),
        };
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), internal);
    }

    /// Remove one entry by key.
    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.write();
        entries.remove(key);
    }

    /// Remove every entry tagged with `tag`. The wildcard tag clears the
    /// whole cache. Returns the number of removed entries.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        let mut entries = self.entries.write();
        if tag == WILDCARD_TAG {
            let removed = entries.len();
            entries.clear();
            return removed;
        }
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        before - entries.len()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
    }

    /// Cache statistics, counting expired-but-unswept entries separately.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let now = Instant::now();
        let valid_entries = entries.values().filter(|e| e.expires_at > now).count();
        CacheStats {
            total_entries: entries.len(),
            valid_entries,
        }
    }

    fn maybe_cleanup(&self) {
        let now = Instant::now();
        {
            let last = self.last_cleanup.read();
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
        }
        if let Some(mut last) = self.last_cleanup.try_write() {
            if now.duration_since(*last) >= self.cleanup_interval {
                *last = now;
                if let Some(mut entries) = self.entries.try_write() {
                    entries.retain(|_, e| e.expires_at > now);
                }
            }
        }
    }
}

impl<T: Clone> TaggedCache<T> {
    /// Get a non-expired value by key.
    pub fn get(&self, key: &str) -> Option<T> {
        self.maybe_cleanup();
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            None
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total number of entries, including expired ones not yet swept.
    pub total_entries: usize,
    /// Number of non-expired entries.
    pub valid_entries: usize,
}

/// Tag-scoped eviction, the one capability the invalidator needs from any
/// cache layer.
pub trait TagEvict: Send + Sync {
    /// Remove every entry under `tag`; the wildcard tag clears everything.
    fn remove_by_tag(&self, tag: &str) -> usize;
}

impl<T: Send + Sync> TagEvict for TaggedCache<T> {
    fn remove_by_tag(&self, tag: &str) -> usize {
        TaggedCache::remove_by_tag(self, tag)
    }
}
