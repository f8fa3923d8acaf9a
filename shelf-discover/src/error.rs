//! Error types for shelf-discover
//!
//! Search failures carry the remote or decode error untouched so callers
//! can choose their own presentation per kind. Persistent-cache failures
//! never reach this type.

use thiserror::Error;

use crate::services::books_decoder::DecodeError;
use crate::services::http_transport::RemoteError;

/// Search error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoverError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl DiscoverError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            DiscoverError::Remote(err) => err.kind(),
            DiscoverError::Decode(_) => "decode",
        }
    }

    /// HTTP status code when the server answered outside 2xx
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DiscoverError::Remote(err) => err.status_code(),
            DiscoverError::Decode(_) => None,
        }
    }
}

/// Result type for search operations
pub type DiscoverResult<T> = Result<T, DiscoverError>;
