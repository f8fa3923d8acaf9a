//! In-memory first cache tier
//!
//! Process-lifetime map from [`CacheKey`] to a timestamped result set.
//! Staleness is checked by the reader; entries are overwritten on refresh
//! and never swept.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{CacheEntry, CacheKey};

/// Default freshness window for the memory tier (10 minutes)
pub const DEFAULT_MEMORY_TTL_SECS: i64 = 600;

#[derive(Debug)]
pub struct MemoryCache<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> MemoryCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Items for `key` if the entry is younger than the TTL at `now`
    pub fn get_fresh(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Vec<T>> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.items.clone())
    }

    /// Raw entry regardless of freshness
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Store (or overwrite) the entry for `key`
    pub fn insert(&mut self, key: CacheKey, items: Vec<T>, timestamp: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry::new(timestamp, items));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_MEMORY_TTL_SECS))
    }
}
