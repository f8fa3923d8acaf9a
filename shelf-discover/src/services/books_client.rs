//! Google Books API client
//!
//! Builds deterministic request URLs and returns raw response bytes;
//! decoding lives in [`super::books_decoder`].
//!
//! # API Reference
//! - Search: `GET {base}/volumes?q={query}&maxResults={1..40}`
//! - Detail: `GET {base}/volumes/{id}`

use reqwest::Url;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::http_transport::{HttpRequest, HttpTransport, RemoteError};

/// Google Books API base URL
pub const GOOGLE_BOOKS_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Largest page size the API accepts
pub const MAX_RESULTS_CEILING: u32 = 40;

/// User-Agent header sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!(
    "shelf-discover/",
    env!("CARGO_PKG_VERSION"),
    " (reading tracker book discovery)"
);

/// Clamp a requested page size into `[1, MAX_RESULTS_CEILING]`
pub fn clamp_max_results(requested: u32) -> u32 {
    requested.clamp(1, MAX_RESULTS_CEILING)
}

/// Books API client
pub struct GoogleBooksClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    user_agent: String,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(format!(
                "{base_url}: not usable as a base URL"
            )));
        }

        Ok(Self {
            transport,
            base_url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            api_key: None,
        })
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// API key sent as the `key` query item; blank keys are ignored
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Build a request URL from the base, path segments and query items
    ///
    /// Each segment is appended as one percent-encoded path segment, so a
    /// `/` inside a segment never adds a level.
    ///
    /// Query items are de-duplicated by key (last write wins) and emitted in
    /// key order, so equal inputs always produce byte-identical URLs.
    /// Items already present on the base URL take part in the merge.
    pub fn build_url(
        &self,
        path: &[&str],
        query_items: &[(&str, String)],
    ) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            for segment in path {
                segments.push(segment);
            }
        }

        let mut merged: BTreeMap<String, String> = self
            .base_url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        for (key, value) in query_items {
            merged.insert((*key).to_string(), value.clone());
        }

        if merged.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(merged.iter());
        }

        Ok(url)
    }

    /// Search volumes; returns the raw JSON body
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<u8>, RemoteError> {
        let mut items = vec![
            ("q", query.to_string()),
            ("maxResults", clamp_max_results(max_results).to_string()),
        ];
        if let Some(key) = &self.api_key {
            items.push(("key", key.clone()));
        }

        let url = self.build_url(&["volumes"], &items)?;
        self.get(url).await
    }

    /// Fetch a single volume; returns the raw JSON body
    pub async fn detail(&self, id: &str) -> Result<Vec<u8>, RemoteError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(RemoteError::InvalidUrl("empty volume id".to_string()));
        }

        let mut items = Vec::new();
        if let Some(key) = &self.api_key {
            items.push(("key", key.clone()));
        }

        let url = self.build_url(&["volumes", id], &items)?;
        self.get(url).await
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, RemoteError> {
        let path = url.path().to_string();
        let request = HttpRequest::get(url)
            .with_header("Accept", "application/json")
            .with_header("Accept-Charset", "utf-8")
            .with_header("User-Agent", self.user_agent.clone());

        let started = Instant::now();
        let response = self.transport.request(request).await?;

        if cfg!(debug_assertions) {
            debug!(
                path = %path,
                status = response.status,
                bytes = response.body.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Books API response"
            );
        }

        response.into_success_body()
    }
}
