//! Cache keys and timestamped cache entries shared by both cache tiers

use chrono::{DateTime, Duration, Utc};

use super::category::{Category, NO_CATEGORY_ID};

/// Composite cache key: trimmed query plus category id (or `"none"`)
///
/// Both components are trimmed at construction, so keys built from
/// `" stoicism "` and `"stoicism"` compare equal. No case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    query: String,
    category_id: String,
}

impl CacheKey {
    pub fn new(query: &str, category_id: Option<&str>) -> Self {
        let category_id = category_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(NO_CATEGORY_ID);

        Self {
            query: query.trim().to_string(),
            category_id: category_id.to_string(),
        }
    }

    /// Key for a search request
    pub fn for_search(query: &str, category: Option<&Category>) -> Self {
        Self::new(query, category.map(|c| c.id.as_str()))
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }
}

/// Items stored together with the instant they were fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub timestamp: DateTime<Utc>,
    pub items: Vec<T>,
}

impl<T> CacheEntry<T> {
    pub fn new(timestamp: DateTime<Utc>, items: Vec<T>) -> Self {
        Self { timestamp, items }
    }

    /// Age of the entry at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    /// Fresh while strictly younger than `ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}
