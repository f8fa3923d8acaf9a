//! Database access for shelf-discover

pub mod feed_cache;

pub use feed_cache::{FeedCacheError, FeedCacheStore, SqliteFeedCache};
