//! shelf-discover library interface
//!
//! Discover search pipeline: Books API client, response decoder, memory and
//! persistent cache tiers, and the search orchestrator that composes them.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::DiscoverConfig;
pub use crate::error::{DiscoverError, DiscoverResult};
pub use crate::models::{Category, RemoteBookRecord};
pub use crate::services::{BookSearchRepository, SearchSettings};

use shelf_common::SystemClock;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::SqliteFeedCache;
use crate::services::{GoogleBooksClient, RemoteError, ReqwestTransport};

/// Books API client over reqwest, configured from `config`
pub fn build_books_client(config: &DiscoverConfig) -> Result<GoogleBooksClient, RemoteError> {
    let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
    Ok(GoogleBooksClient::new(transport, &config.base_url)?
        .with_user_agent(config.user_agent.clone())
        .with_api_key(config.api_key.clone()))
}

/// Wire a search repository against the live API and the given database
pub fn build_search_repository(
    config: &DiscoverConfig,
    pool: SqlitePool,
) -> Result<BookSearchRepository, RemoteError> {
    let client = build_books_client(config)?;
    Ok(BookSearchRepository::new(
        client,
        Arc::new(SqliteFeedCache::new(pool)),
        Arc::new(SystemClock),
        config.search_settings(),
    ))
}
