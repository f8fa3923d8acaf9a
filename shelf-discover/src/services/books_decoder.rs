//! Books API response decoding
//!
//! Two steps: raw JSON into transfer objects (`*Dto`), then transfer objects
//! into validated [`RemoteBookRecord`]s. Only a wrong top-level shape is an
//! error; unusable volumes are skipped and logged at debug level.

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::RemoteBookRecord;

/// Decoder errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Volume has no usable id or title")]
    UnusableVolume,
}

/// One entry of the `items` array
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDto {
    pub id: Option<String>,
    pub volume_info: Option<VolumeInfoDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfoDto {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub description: Option<String>,
    pub preview_link: Option<String>,
    pub info_link: Option<String>,
    pub image_links: Option<ImageLinksDto>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinksDto {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
}

/// Decode a search response body into records
pub fn decode_search_results(bytes: &[u8]) -> Result<Vec<RemoteBookRecord>, DecodeError> {
    let mut root = parse_object(bytes)?;

    let items = match root.remove("items") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(DecodeError::UnexpectedShape(
                "`items` is not an array".to_string(),
            ))
        }
    };

    let received = items.len();
    let records: Vec<RemoteBookRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<VolumeDto>(item) {
            Ok(volume) => map_volume(volume),
            Err(e) => {
                debug!(index, error = %e, "Skipping malformed volume entry");
                None
            }
        })
        .collect();

    debug!(
        received,
        kept = records.len(),
        skipped = received - records.len(),
        "Decoded search results"
    );

    Ok(records)
}

/// Decode a single-volume (detail) response body
pub fn decode_volume_detail(bytes: &[u8]) -> Result<RemoteBookRecord, DecodeError> {
    let root = parse_object(bytes)?;
    let volume: VolumeDto = serde_json::from_value(Value::Object(root))
        .map_err(|e| DecodeError::UnexpectedShape(e.to_string()))?;
    map_volume(volume).ok_or(DecodeError::UnusableVolume)
}

fn parse_object(bytes: &[u8]) -> Result<serde_json::Map<String, Value>, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::UnexpectedShape(format!(
            "top-level value is {}, expected an object",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Map one transfer object to a record, or `None` when it is unusable
pub fn map_volume(volume: VolumeDto) -> Option<RemoteBookRecord> {
    let Some(info) = volume.volume_info else {
        debug!(id = ?volume.id, "Skipping volume without volumeInfo");
        return None;
    };

    let Some(id) = clean_text(volume.id) else {
        debug!(title = ?info.title, "Skipping volume without id");
        return None;
    };

    let Some(title) = clean_text(info.title) else {
        debug!(id = %id, "Skipping volume without usable title");
        return None;
    };

    let authors = info
        .authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|name| clean_text(Some(name)))
        .collect();

    let thumbnail_url = info.image_links.and_then(|links| {
        clean_text(links.thumbnail)
            .and_then(secure_url)
            .or_else(|| clean_text(links.small_thumbnail).and_then(secure_url))
    });

    let preview_url = clean_text(info.preview_link).and_then(secure_url);
    let info_url = clean_text(info.info_link)
        .and_then(secure_url)
        .or_else(|| preview_url.clone());

    Some(RemoteBookRecord {
        id,
        title,
        subtitle: clean_text(info.subtitle),
        authors,
        publisher: clean_text(info.publisher),
        published_date: clean_text(info.published_date),
        page_count: info
            .page_count
            .filter(|count| *count > 0)
            .and_then(|count| u32::try_from(count).ok()),
        description: clean_text(info.description),
        categories: dedupe_categories(info.categories.unwrap_or_default()),
        thumbnail_url,
        preview_url,
        info_url,
        language: clean_text(info.language),
    })
}

/// Trim; empty becomes `None`
fn clean_text(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Upgrade `http://` to `https://` and keep only absolute https URLs
pub fn secure_url(raw: String) -> Option<String> {
    let upgraded = match raw.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http://") => format!("https://{}", &raw[7..]),
        _ => raw,
    };

    match Url::parse(&upgraded) {
        Ok(url) if url.scheme() == "https" && url.has_host() => Some(upgraded),
        Ok(url) => {
            debug!(scheme = url.scheme(), "Dropping non-https link");
            None
        }
        Err(e) => {
            debug!(error = %e, "Dropping unparseable link");
            None
        }
    }
}

/// Comparison form of a category: decomposed, combining marks removed,
/// lowercased
fn fold_category(category: &str) -> String {
    category
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Trim, drop empties, and de-duplicate case- and diacritic-insensitively,
/// keeping the first-seen spelling and original order
pub fn dedupe_categories(categories: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    categories
        .into_iter()
        .filter_map(|category| clean_text(Some(category)))
        .filter(|category| seen.insert(fold_category(category)))
        .collect()
}
