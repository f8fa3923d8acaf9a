//! Validated, display-ready search result

use serde::{Deserialize, Serialize};

/// One remote volume after validation and normalization
///
/// Built only by the decoder (or restored from the feed cache). A record
/// always has a non-empty `id` and `title`; optional strings are trimmed and
/// never empty; URLs are absolute and use `https`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBookRecord {
    /// External volume identifier
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// Trimmed, non-empty author names in source order
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    /// Publication date as given by the source ("2004", "2004-05", ...)
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
    pub description: Option<String>,
    /// De-duplicated categories, first-seen casing kept
    pub categories: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub preview_url: Option<String>,
    pub info_url: Option<String>,
    /// Language code (e.g. "en")
    pub language: Option<String>,
}

impl RemoteBookRecord {
    /// Minimal record with only identity fields set
    pub fn skeleton(
        id: impl Into<String>,
        title: impl Into<String>,
        author: Option<String>,
        thumbnail_url: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            authors: author.into_iter().collect(),
            publisher: None,
            published_date: None,
            page_count: None,
            description: None,
            categories: Vec::new(),
            thumbnail_url,
            preview_url: None,
            info_url: None,
            language: None,
        }
    }

    /// First listed author, if any
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}
