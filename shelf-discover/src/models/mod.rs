//! Domain models for the Discover pipeline

pub mod cache;
pub mod category;
pub mod feed_item;
pub mod remote_book;

pub use cache::{CacheEntry, CacheKey};
pub use category::{Category, NO_CATEGORY_ID};
pub use feed_item::PersistedFeedItem;
pub use remote_book::RemoteBookRecord;
