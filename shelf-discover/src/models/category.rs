//! Discover categories

use serde::{Deserialize, Serialize};

/// Category id used in cache keys when a search has no category
pub const NO_CATEGORY_ID: &str = "none";

/// A Discover category (e.g. "fiction", "philosophy")
///
/// Only `id` takes part in caching; `name` is carried for display by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
