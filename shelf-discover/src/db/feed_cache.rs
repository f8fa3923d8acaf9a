//! Persistent Discover feed cache
//!
//! Rows live in the `discover_feed` table created by
//! `shelf_common::db::create_discover_feed_table`. Rows are keyed by category
//! only: `query` is stored alongside each row but does not discriminate
//! reads or replaces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shelf_common::time::{from_epoch_millis, to_epoch_millis};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{PersistedFeedItem, RemoteBookRecord};

/// Maximum rows returned by one fetch
pub const FEED_FETCH_LIMIT: i64 = 40;

/// Default freshness window for persisted rows (24 hours)
pub const DEFAULT_FEED_TTL_SECS: i64 = 86_400;

#[derive(Debug, Error)]
pub enum FeedCacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable feed store contract
#[async_trait]
pub trait FeedCacheStore: Send + Sync {
    /// Up to [`FEED_FETCH_LIMIT`] rows for a category, newest fetch first
    async fn fetch(
        &self,
        category_id: &str,
        query: &str,
    ) -> Result<Vec<PersistedFeedItem>, FeedCacheError>;

    /// Atomically replace every row of `category_id` with `items`
    ///
    /// Either the old rows or the new rows are visible afterwards, never a mix.
    async fn replace(
        &self,
        category_id: &str,
        query: &str,
        items: &[RemoteBookRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<(), FeedCacheError>;

    /// Delete rows fetched before `older_than`; returns the number removed
    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, FeedCacheError>;
}

/// SQLite-backed feed store
#[derive(Debug, Clone)]
pub struct SqliteFeedCache {
    pool: SqlitePool,
}

impl SqliteFeedCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedCacheStore for SqliteFeedCache {
    async fn fetch(
        &self,
        category_id: &str,
        query: &str,
    ) -> Result<Vec<PersistedFeedItem>, FeedCacheError> {
        let rows = sqlx::query(
            r#"
            SELECT source_id, title, author, thumbnail_url, category_id, query,
                   fetched_at, record_json
            FROM discover_feed
            WHERE category_id = ?
            ORDER BY fetched_at DESC, position ASC
            LIMIT ?
            "#,
        )
        .bind(category_id)
        .bind(FEED_FETCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<PersistedFeedItem> = rows
            .into_iter()
            .map(|row| {
                let source_id: String = row.get("source_id");
                let record_json: Option<String> = row.get("record_json");
                let record = record_json.and_then(|json| {
                    serde_json::from_str::<RemoteBookRecord>(&json)
                        .map_err(|e| {
                            debug!(source_id = %source_id, error = %e, "Ignoring unreadable stored record")
                        })
                        .ok()
                });

                PersistedFeedItem {
                    source_id,
                    title: row.get("title"),
                    author: row.get("author"),
                    thumbnail_url: row.get("thumbnail_url"),
                    category_id: row.get("category_id"),
                    query: row.get("query"),
                    fetched_at: from_epoch_millis(row.get("fetched_at")),
                    record,
                }
            })
            .collect();

        debug!(
            category_id = %category_id,
            query = %query,
            rows = items.len(),
            "Fetched feed cache rows"
        );

        Ok(items)
    }

    async fn replace(
        &self,
        category_id: &str,
        query: &str,
        items: &[RemoteBookRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<(), FeedCacheError> {
        let fetched_at_ms = to_epoch_millis(fetched_at);

        // Dropping `tx` on any early return rolls the whole replace back
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM discover_feed WHERE category_id = ?")
            .bind(category_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for (position, record) in items.iter().enumerate() {
            let item = PersistedFeedItem::from_record(record, category_id, query, fetched_at);
            let record_json = serde_json::to_string(record)?;

            // source_id is unique across categories; a volume seen under a
            // new category moves there
            sqlx::query(
                r#"
                INSERT INTO discover_feed (
                    source_id, title, author, thumbnail_url, category_id, query,
                    fetched_at, position, record_json
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(source_id) DO UPDATE SET
                    title = excluded.title,
                    author = excluded.author,
                    thumbnail_url = excluded.thumbnail_url,
                    category_id = excluded.category_id,
                    query = excluded.query,
                    fetched_at = excluded.fetched_at,
                    position = excluded.position,
                    record_json = excluded.record_json
                "#,
            )
            .bind(&item.source_id)
            .bind(&item.title)
            .bind(&item.author)
            .bind(&item.thumbnail_url)
            .bind(&item.category_id)
            .bind(&item.query)
            .bind(fetched_at_ms)
            .bind(position as i64)
            .bind(&record_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            category_id = %category_id,
            removed,
            inserted = items.len(),
            "Replaced feed cache rows"
        );

        Ok(())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, FeedCacheError> {
        let removed = sqlx::query("DELETE FROM discover_feed WHERE fetched_at < ?")
            .bind(to_epoch_millis(older_than))
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, cutoff = %older_than, "Pruned feed cache");

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use shelf_common::db::init_memory_database;

    fn record(id: &str, title: &str) -> RemoteBookRecord {
        RemoteBookRecord {
            description: Some(format!("About {title}")),
            ..RemoteBookRecord::skeleton(id, title, Some("Author".to_string()), None)
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    async fn cache() -> SqliteFeedCache {
        SqliteFeedCache::new(init_memory_database().await.expect("memory db"))
    }

    #[tokio::test]
    async fn test_replace_then_fetch_keeps_full_records_in_order() {
        let cache = cache().await;
        let records = vec![record("b", "Second"), record("a", "First")];
        cache.replace("fiction", "dune", &records, at(8)).await.unwrap();

        let items = cache.fetch("fiction", "dune").await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.source_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(items[0].fetched_at, at(8));
        assert_eq!(items[0].query, "dune");
        assert_eq!(items[0].record.as_ref(), Some(&records[0]));
    }

    #[tokio::test]
    async fn test_replace_removes_previous_rows_of_category_only() {
        let cache = cache().await;
        cache
            .replace("fiction", "q1", &[record("old", "Old")], at(1))
            .await
            .unwrap();
        cache
            .replace("history", "q2", &[record("other", "Other")], at(1))
            .await
            .unwrap();
        cache
            .replace("fiction", "q3", &[record("new", "New")], at(2))
            .await
            .unwrap();

        let fiction = cache.fetch("fiction", "q3").await.unwrap();
        assert_eq!(fiction.len(), 1);
        assert_eq!(fiction[0].source_id, "new");

        let history = cache.fetch("history", "q2").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_query_does_not_discriminate_rows() {
        let cache = cache().await;
        cache
            .replace("none", "stoicism", &[record("s1", "Stoic")], at(3))
            .await
            .unwrap();

        let items = cache.fetch("none", "something else").await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_caps_at_limit() {
        let cache = cache().await;
        let records: Vec<RemoteBookRecord> = (0..55)
            .map(|i| record(&format!("id-{i}"), &format!("Title {i}")))
            .collect();
        cache.replace("fiction", "many", &records, at(4)).await.unwrap();

        let items = cache.fetch("fiction", "many").await.unwrap();
        assert_eq!(items.len() as i64, FEED_FETCH_LIMIT);
        assert_eq!(items[0].source_id, "id-0");
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_rows() {
        let cache = cache().await;
        cache
            .replace("fiction", "q", &[record("keep-1", "Keep"), record("keep-2", "Keep too")], at(5))
            .await
            .unwrap();

        // The empty id violates the table CHECK after the delete and one insert
        let broken = vec![record("fresh", "Fresh"), record("", "Broken")];
        let result = cache.replace("fiction", "q", &broken, at(6)).await;
        assert!(matches!(result, Err(FeedCacheError::Database(_))));

        let items = cache.fetch("fiction", "q").await.unwrap();
        let mut ids: Vec<&str> = items.iter().map(|i| i.source_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["keep-1", "keep-2"]);
        assert!(items.iter().all(|i| i.fetched_at == at(5)));
    }

    #[tokio::test]
    async fn test_volume_moves_between_categories() {
        let cache = cache().await;
        cache
            .replace("fiction", "q", &[record("shared", "Shared")], at(1))
            .await
            .unwrap();
        cache
            .replace("classics", "q", &[record("shared", "Shared")], at(2))
            .await
            .unwrap();

        assert!(cache.fetch("fiction", "q").await.unwrap().is_empty());
        let classics = cache.fetch("classics", "q").await.unwrap();
        assert_eq!(classics.len(), 1);
        assert_eq!(classics[0].category_id, "classics");
    }

    #[tokio::test]
    async fn test_prune_removes_only_older_rows() {
        let cache = cache().await;
        cache
            .replace("old", "q", &[record("o1", "Old"), record("o2", "Old 2")], at(1))
            .await
            .unwrap();
        cache
            .replace("new", "q", &[record("n1", "New")], at(10))
            .await
            .unwrap();

        let removed = cache.prune(at(10) - Duration::hours(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.fetch("old", "q").await.unwrap().is_empty());
        assert_eq!(cache.fetch("new", "q").await.unwrap().len(), 1);

        // Cutoff equal to fetched_at keeps the row
        assert_eq!(cache.prune(at(10)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_record_json_falls_back_to_row_fields() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO discover_feed (source_id, title, author, category_id, query, fetched_at, record_json)
            VALUES ('legacy', 'Legacy Title', 'Legacy Author', 'fiction', '', 0, '{broken')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let cache = SqliteFeedCache::new(pool);
        let items = cache.fetch("fiction", "").await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].record.is_none());

        let record = items[0].clone().into_record();
        assert_eq!(record.title, "Legacy Title");
        assert_eq!(record.primary_author(), Some("Legacy Author"));
    }
}
