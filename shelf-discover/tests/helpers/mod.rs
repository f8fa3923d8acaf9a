//! Shared fixtures for shelf-discover integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use shelf_common::ManualClock;
use shelf_discover::db::{FeedCacheError, FeedCacheStore, SqliteFeedCache};
use shelf_discover::models::{PersistedFeedItem, RemoteBookRecord};
use shelf_discover::services::http_transport::{HttpRequest, HttpResponse, HttpTransport};
use shelf_discover::services::{GoogleBooksClient, RemoteError};
use shelf_discover::{BookSearchRepository, SearchSettings};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Barrier;

pub const BASE_URL: &str = "https://books.test/books/v1";

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, RemoteError> + Send + Sync>;

/// Deterministic in-process transport
///
/// Counts calls, records every request, and answers through a responder.
pub struct FakeTransport {
    responder: Responder,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    barrier: Option<Arc<Barrier>>,
    delay: Option<Duration>,
}

impl FakeTransport {
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, RemoteError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            barrier: None,
            delay: None,
        }
    }

    /// Always answer `status` with `body`
    pub fn answering(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(move |_| Ok(HttpResponse::new(status, body.clone())))
    }

    /// Always fail with `error`
    pub fn failing(error: RemoteError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Hold every request until `parties` requests are in flight
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.responder)(&request)
    }
}

/// Feed store whose every operation fails
pub struct FailingFeedCache;

#[async_trait]
impl FeedCacheStore for FailingFeedCache {
    async fn fetch(
        &self,
        _category_id: &str,
        _query: &str,
    ) -> Result<Vec<PersistedFeedItem>, FeedCacheError> {
        Err(FeedCacheError::Database(sqlx::Error::PoolClosed))
    }

    async fn replace(
        &self,
        _category_id: &str,
        _query: &str,
        _items: &[RemoteBookRecord],
        _fetched_at: DateTime<Utc>,
    ) -> Result<(), FeedCacheError> {
        Err(FeedCacheError::Database(sqlx::Error::PoolClosed))
    }

    async fn prune(&self, _older_than: DateTime<Utc>) -> Result<u64, FeedCacheError> {
        Err(FeedCacheError::Database(sqlx::Error::PoolClosed))
    }
}

/// Search response body with one volume per `(id, title)` pair
pub fn volumes_body(volumes: &[(&str, &str)]) -> String {
    let items: Vec<_> = volumes
        .iter()
        .map(|(id, title)| {
            json!({
                "id": id,
                "volumeInfo": {
                    "title": title,
                    "authors": ["Test Author"],
                    "imageLinks": { "thumbnail": format!("http://img.test/{id}.jpg") }
                }
            })
        })
        .collect();
    json!({ "kind": "books#volumes", "items": items }).to_string()
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Temporary on-disk database with the Shelf schema
///
/// Keep the `TempDir` alive for the duration of the test.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = shelf_common::config::database_path(temp_dir.path());
    let pool = shelf_common::db::init_database(&db_path).await.unwrap();
    (temp_dir, pool)
}

pub fn repository_with(
    transport: Arc<FakeTransport>,
    feed_cache: Arc<dyn FeedCacheStore>,
    clock: Arc<ManualClock>,
    settings: SearchSettings,
) -> BookSearchRepository {
    let client = GoogleBooksClient::new(transport, BASE_URL).unwrap();
    BookSearchRepository::new(client, feed_cache, clock, settings)
}

/// Repository over a fake transport, a SQLite feed cache and a manual clock
pub fn sqlite_repository(
    transport: Arc<FakeTransport>,
    pool: SqlitePool,
    clock: Arc<ManualClock>,
    settings: SearchSettings,
) -> BookSearchRepository {
    repository_with(
        transport,
        Arc::new(SqliteFeedCache::new(pool)),
        clock,
        settings,
    )
}

/// Source ids persisted for a category, sorted
pub async fn persisted_ids(pool: &SqlitePool, category_id: &str) -> Vec<String> {
    let mut ids: Vec<String> =
        sqlx::query_scalar("SELECT source_id FROM discover_feed WHERE category_id = ?")
            .bind(category_id)
            .fetch_all(pool)
            .await
            .unwrap();
    ids.sort();
    ids
}

pub async fn persisted_row_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM discover_feed")
        .fetch_one(pool)
        .await
        .unwrap()
}
