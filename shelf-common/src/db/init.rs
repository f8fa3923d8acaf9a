//! Database initialization
//!
//! Opens (or creates) the shared SQLite database and creates tables
//! idempotently, so a fresh root folder needs no manual setup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while a feed replace is committing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    let pragma_sql = format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection: every pooled connection to `sqlite::memory:`
/// would otherwise risk seeing a different database once idle connections
/// are recycled.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table this workspace owns (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_discover_feed_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (1)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the discover feed cache table
///
/// One row per remote volume. `fetched_at` is Unix epoch milliseconds;
/// `position` preserves result order within one fetch.
/// `record_json` holds the full serialized record so cached reads keep
/// every field; it is nullable for rows written by lossy producers.
pub async fn create_discover_feed_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discover_feed (
            source_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT,
            thumbnail_url TEXT,
            category_id TEXT NOT NULL,
            query TEXT NOT NULL DEFAULT '',
            fetched_at INTEGER NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            record_json TEXT,
            CHECK (length(source_id) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_discover_feed_category ON discover_feed(category_id, fetched_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_discover_feed_fetched_at ON discover_feed(fetched_at)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
        count == 1
    }

    #[tokio::test]
    async fn test_init_database_creates_file_and_tables() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("shelf.db");

        let pool = init_database(&db_path).await.expect("init database");

        assert!(db_path.exists());
        assert!(table_exists(&pool, "discover_feed").await);
        assert!(table_exists(&pool, "schema_version").await);
    }

    #[tokio::test]
    async fn test_init_database_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("shelf.db");

        let pool = init_database(&db_path).await.unwrap();
        pool.close().await;

        let pool = init_database(&db_path).await.expect("second init");
        assert!(table_exists(&pool, "discover_feed").await);
    }

    #[tokio::test]
    async fn test_empty_source_id_rejected() {
        let pool = init_memory_database().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO discover_feed (source_id, title, category_id, fetched_at) VALUES ('', 't', 'none', 0)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
