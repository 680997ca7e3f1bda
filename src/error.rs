//! Error types for the response cache
//!
//! Every failure is surfaced to the immediate caller; nothing here is retried
//! or swallowed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CachedResponse;
use crate::transport::TransportError;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// State an entry was in when an update was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Absent,
    Stale,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::Absent => write!(f, "absent"),
            EntryState::Stale => write!(f, "stale"),
        }
    }
}

/// Errors produced by the cache store and the cached fetcher
#[derive(Debug, Error)]
pub enum CacheError {
    /// Entry is absent or stale and the caller may only read from the cache
    #[error("cache entry '{key}' is {state} and the cache may not be updated (read-only access)")]
    PermissionDenied { key: String, state: EntryState },

    /// Storage read of a key that has no entry
    #[error("no cache entry for '{0}'")]
    NotFound(String),

    /// The transport call failed; no entry was written
    #[error("upstream request failed: {0}")]
    Upstream(#[from] TransportError),

    /// Reading or writing the storage medium failed
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The body is not valid JSON for the requested type.
    ///
    /// The raw envelope is kept so the caller can still use it.
    #[error("failed to decode response body (status {}): {source}", .response.status)]
    Decode {
        #[source]
        source: serde_json::Error,
        response: CachedResponse,
    },

    /// The persisted envelope itself is not valid JSON
    #[error("corrupt cache entry at {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A custom cache name that cannot be used as a file name
    #[error("invalid cache name '{0}'")]
    InvalidKey(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the raw envelope carried by a decode failure
    pub fn into_response(self) -> Option<CachedResponse> {
        match self {
            CacheError::Decode { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CacheError::PermissionDenied { .. })
    }
}
