//! Durable row of the Discover feed cache

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::remote_book::RemoteBookRecord;

/// One persisted feed row
///
/// A flat projection of [`RemoteBookRecord`] for listing, plus the full
/// record when the writer stored it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedFeedItem {
    /// Unique external id (same as `RemoteBookRecord::id`)
    pub source_id: String,
    pub title: String,
    pub author: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category_id: String,
    /// Query that produced the row (informational, not part of the key)
    pub query: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub record: Option<RemoteBookRecord>,
}

impl PersistedFeedItem {
    pub fn from_record(
        record: &RemoteBookRecord,
        category_id: &str,
        query: &str,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: record.id.clone(),
            title: record.title.clone(),
            author: record.primary_author().map(str::to_string),
            thumbnail_url: record.thumbnail_url.clone(),
            category_id: category_id.to_string(),
            query: query.to_string(),
            fetched_at,
            record: Some(record.clone()),
        }
    }

    /// Restore a domain record, falling back to a skeleton when the full
    /// record was not stored
    pub fn into_record(self) -> RemoteBookRecord {
        match self.record {
            Some(record) => record,
            None => RemoteBookRecord::skeleton(
                self.source_id,
                self.title,
                self.author,
                self.thumbnail_url,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> RemoteBookRecord {
        RemoteBookRecord {
            subtitle: Some("A New Translation".to_string()),
            publisher: Some("Modern Library".to_string()),
            categories: vec!["Philosophy".to_string()],
            ..RemoteBookRecord::skeleton(
                "vol-1",
                "Meditations",
                Some("Marcus Aurelius".to_string()),
                Some("https://books.example/cover.png".to_string()),
            )
        }
    }

    #[test]
    fn test_projection_keeps_identity_fields() {
        let now = Utc::now();
        let item = PersistedFeedItem::from_record(&full_record(), "philosophy", "stoic", now);

        assert_eq!(item.source_id, "vol-1");
        assert_eq!(item.author.as_deref(), Some("Marcus Aurelius"));
        assert_eq!(item.category_id, "philosophy");
        assert_eq!(item.fetched_at, now);
    }

    #[test]
    fn test_into_record_prefers_stored_record() {
        let item = PersistedFeedItem::from_record(&full_record(), "philosophy", "stoic", Utc::now());
        assert_eq!(item.into_record(), full_record());
    }

    #[test]
    fn test_into_record_falls_back_to_skeleton() {
        let mut item =
            PersistedFeedItem::from_record(&full_record(), "philosophy", "stoic", Utc::now());
        item.record = None;

        let record = item.into_record();
        assert_eq!(record.title, "Meditations");
        assert_eq!(record.authors, vec!["Marcus Aurelius".to_string()]);
        assert!(record.subtitle.is_none());
        assert!(record.publisher.is_none());
    }
}
