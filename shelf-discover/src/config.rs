//! Configuration for shelf-discover
//!
//! Resolution order for each setting: environment → TOML file → default.
//! The TOML file is `discover.toml` in the Shelf config directory unless a
//! path is given explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_common::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::db::feed_cache::DEFAULT_FEED_TTL_SECS;
use crate::services::books_client::{DEFAULT_USER_AGENT, GOOGLE_BOOKS_BASE_URL};
use crate::services::memory_cache::DEFAULT_MEMORY_TTL_SECS;
use crate::services::search_repository::SearchSettings;

/// Module name used for config file lookup
pub const MODULE_NAME: &str = "discover";

/// Environment variable overriding `api_key`
pub const API_KEY_ENV_VAR: &str = "SHELF_BOOKS_API_KEY";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV_VAR: &str = "SHELF_BOOKS_BASE_URL";

/// Default page size when the caller does not specify one
pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Upper bound for `request_timeout_secs` (10 minutes)
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Upper bound for both cache TTLs (10 years)
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Upper bound for feed retention, in hours (10 years)
pub const MAX_RETENTION_HOURS: i64 = 10 * 365 * 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverConfig {
    /// Books API base URL
    pub base_url: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub memory_ttl_secs: i64,
    pub feed_ttl_secs: i64,
    pub default_max_results: u32,
    /// Consult the persistent feed cache after a memory miss
    pub persistent_read: bool,
    /// Age beyond which `prune` removes feed rows
    pub feed_retention_hours: i64,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            base_url: GOOGLE_BOOKS_BASE_URL.to_string(),
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 15,
            memory_ttl_secs: DEFAULT_MEMORY_TTL_SECS,
            feed_ttl_secs: DEFAULT_FEED_TTL_SECS,
            default_max_results: DEFAULT_MAX_RESULTS,
            persistent_read: false,
            feed_retention_hours: 168,
        }
    }
}

impl DiscoverConfig {
    /// Load configuration from `path`, or from the default config file
    /// location when `path` is `None`, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                info!("Loading discover config from {}", path.display());
                shelf_common::config::load_toml(path)?
            }
            None => match shelf_common::config::find_config_file(MODULE_NAME) {
                Ok(found) => {
                    info!("Loading discover config from {}", found.display());
                    shelf_common::config::load_toml(&found)?
                }
                Err(e) => {
                    debug!("No discover config file ({}); using defaults", e);
                    Self::default()
                }
            },
        };

        let config = config.with_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV_VAR).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(BASE_URL_ENV_VAR).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(Error::Config(format!(
                "request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}"
            )));
        }
        check_range("memory_ttl_secs", self.memory_ttl_secs, MAX_TTL_SECS)?;
        check_range("feed_ttl_secs", self.feed_ttl_secs, MAX_TTL_SECS)?;
        check_range(
            "feed_retention_hours",
            self.feed_retention_hours,
            MAX_RETENTION_HOURS,
        )?;
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    // Accessors clamp into the validated range so an unvalidated config
    // still yields a usable duration.

    pub fn memory_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.memory_ttl_secs.clamp(1, MAX_TTL_SECS))
    }

    pub fn feed_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.feed_ttl_secs.clamp(1, MAX_TTL_SECS))
    }

    pub fn feed_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.feed_retention_hours.clamp(1, MAX_RETENTION_HOURS))
    }

    /// Cutoff for a prune run at `now`
    ///
    /// `older_than_hours` overrides the configured retention and must lie in
    /// `1..=MAX_RETENTION_HOURS`.
    pub fn prune_cutoff(
        &self,
        now: DateTime<Utc>,
        older_than_hours: Option<i64>,
    ) -> Result<DateTime<Utc>> {
        let retention = match older_than_hours {
            Some(hours) if (1..=MAX_RETENTION_HOURS).contains(&hours) => {
                chrono::Duration::hours(hours)
            }
            Some(hours) => {
                return Err(Error::InvalidInput(format!(
                    "older-than-hours must be between 1 and {MAX_RETENTION_HOURS}, got {hours}"
                )))
            }
            None => self.feed_retention(),
        };
        Ok(now - retention)
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            memory_ttl: self.memory_ttl(),
            feed_ttl: self.feed_ttl(),
            default_max_results: self.default_max_results,
            persistent_read: self.persistent_read,
        }
    }
}

fn check_range(name: &str, value: i64, max: i64) -> Result<()> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must be between 1 and {max}")))
    }
}
