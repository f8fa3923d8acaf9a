//! Discover search orchestration
//!
//! Composes the remote client, decoder and both cache tiers:
//!
//! 1. Trim the query; empty queries return no results and touch nothing
//! 2. Memory tier (fresh within `memory_ttl`)
//! 3. Persistent tier, only when `persistent_read` is enabled
//! 4. Network, single attempt, errors propagate untouched
//! 5. Write-through to memory, then best-effort to the persistent tier
//!
//! The memory lock is never held across the network await. Concurrent
//! searches for the same key are not coalesced; the last completion wins.

use chrono::Duration;
use shelf_common::Clock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::FeedCacheStore;
use crate::error::DiscoverResult;
use crate::models::{CacheKey, Category, RemoteBookRecord};
use crate::services::books_client::{clamp_max_results, GoogleBooksClient};
use crate::services::books_decoder::decode_search_results;
use crate::services::http_transport::RemoteError;
use crate::services::memory_cache::{MemoryCache, DEFAULT_MEMORY_TTL_SECS};

/// Tunables for [`BookSearchRepository`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub memory_ttl: Duration,
    pub feed_ttl: Duration,
    pub default_max_results: u32,
    /// Consult the persistent feed cache after a memory miss
    pub persistent_read: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            memory_ttl: Duration::seconds(DEFAULT_MEMORY_TTL_SECS),
            feed_ttl: Duration::seconds(crate::db::feed_cache::DEFAULT_FEED_TTL_SECS),
            default_max_results: 20,
            persistent_read: false,
        }
    }
}

pub struct BookSearchRepository {
    client: GoogleBooksClient,
    feed_cache: Arc<dyn FeedCacheStore>,
    clock: Arc<dyn Clock>,
    memory: Mutex<MemoryCache<RemoteBookRecord>>,
    feed_ttl: Duration,
    default_max_results: u32,
    persistent_read: bool,
}

impl BookSearchRepository {
    pub fn new(
        client: GoogleBooksClient,
        feed_cache: Arc<dyn FeedCacheStore>,
        clock: Arc<dyn Clock>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            client,
            feed_cache,
            clock,
            memory: Mutex::new(MemoryCache::new(settings.memory_ttl)),
            feed_ttl: settings.feed_ttl,
            default_max_results: clamp_max_results(settings.default_max_results),
            persistent_read: settings.persistent_read,
        }
    }

    /// Search for volumes matching `query` within an optional category
    ///
    /// `max_results` defaults to the configured page size and is clamped to
    /// the API range by the client.
    pub async fn search(
        &self,
        query: Option<&str>,
        category: Option<&Category>,
        max_results: Option<u32>,
    ) -> DiscoverResult<Vec<RemoteBookRecord>> {
        self.search_with_cancel(query, category, max_results, &CancellationToken::new())
            .await
    }

    /// [`search`](Self::search) with cooperative cancellation of the remote call
    ///
    /// Cancellation surfaces as [`RemoteError::Cancelled`] and leaves both
    /// cache tiers untouched.
    pub async fn search_with_cancel(
        &self,
        query: Option<&str>,
        category: Option<&Category>,
        max_results: Option<u32>,
        cancel: &CancellationToken,
    ) -> DiscoverResult<Vec<RemoteBookRecord>> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            debug!("Empty query, skipping search");
            return Ok(Vec::new());
        }

        let key = CacheKey::for_search(query, category);

        if let Some(items) = self.memory.lock().await.get_fresh(&key, self.clock.now()) {
            debug!(
                query = key.query(),
                category = key.category_id(),
                count = items.len(),
                "Memory cache hit"
            );
            return Ok(items);
        }

        let max_results = clamp_max_results(max_results.unwrap_or(self.default_max_results));

        if self.persistent_read {
            if let Some(items) = self.read_persistent(&key, max_results).await {
                return Ok(items);
            }
        }

        debug!(
            query = key.query(),
            category = key.category_id(),
            max_results,
            "Cache miss, querying Books API"
        );

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled.into()),
            result = self.client.search(key.query(), max_results) => result?,
        };
        let records = decode_search_results(&body)?;

        let fetched_at = self.clock.now();
        self.memory
            .lock()
            .await
            .insert(key.clone(), records.clone(), fetched_at);

        match self
            .feed_cache
            .replace(key.category_id(), key.query(), &records, fetched_at)
            .await
        {
            Ok(()) => info!(
                category = key.category_id(),
                count = records.len(),
                "Discover feed cache updated"
            ),
            Err(e) => warn!(
                category = key.category_id(),
                error = %e,
                "Failed to update discover feed cache"
            ),
        }

        Ok(records)
    }

    /// Fresh persisted rows for `key`, also promoted into the memory tier
    ///
    /// The store is keyed by category, so the newest batch only counts as a
    /// hit when it was written for the same query. Store errors are logged
    /// and treated as a miss. At most `max_results` records are returned.
    async fn read_persistent(
        &self,
        key: &CacheKey,
        max_results: u32,
    ) -> Option<Vec<RemoteBookRecord>> {
        let rows = match self.feed_cache.fetch(key.category_id(), key.query()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    category = key.category_id(),
                    error = %e,
                    "Failed to read discover feed cache"
                );
                return None;
            }
        };

        let newest = rows.iter().map(|row| row.fetched_at).max()?;
        let batch: Vec<_> = rows
            .into_iter()
            .filter(|row| row.fetched_at == newest)
            .collect();
        if batch.iter().any(|row| row.query != key.query()) {
            debug!(
                query = key.query(),
                category = key.category_id(),
                "Persisted feed belongs to another query"
            );
            return None;
        }
        if self.clock.now() - newest >= self.feed_ttl {
            debug!(category = key.category_id(), "Persisted feed is stale");
            return None;
        }

        let records: Vec<RemoteBookRecord> = batch
            .into_iter()
            .take(max_results as usize)
            .map(|row| row.into_record())
            .collect();
        debug!(
            category = key.category_id(),
            count = records.len(),
            "Persistent cache hit"
        );

        self.memory
            .lock()
            .await
            .insert(key.clone(), records.clone(), newest);
        Some(records)
    }

    /// Number of keys currently held by the memory tier, stale ones included
    pub async fn cached_key_count(&self) -> usize {
        self.memory.lock().await.len()
    }

    /// Drop every memory-tier entry so the next search goes past it
    pub async fn clear_memory_cache(&self) {
        self.memory.lock().await.clear();
    }
}
