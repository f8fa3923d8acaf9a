//! # Shelf Common Library
//!
//! Shared code for the Shelf services including:
//! - Error types
//! - Configuration file discovery and root folder resolution
//! - SQLite database initialization
//! - Clock abstraction for time-dependent logic

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
