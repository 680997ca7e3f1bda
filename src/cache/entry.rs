//! The persisted response envelope

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// A cached HTTP response as stored on disk
///
/// Serialized as `{"status": <int>, "body": "<raw payload>"}`. A JSON payload is
/// kept as a string, so it ends up double-encoded in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status code returned upstream
    pub status: u16,
    /// Raw, undecoded response body
    pub body: String,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parses the body as JSON into `T`
    ///
    /// On failure the envelope is moved into the returned `CacheError::Decode`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        self.into_decoded().map(|decoded| decoded.value)
    }

    /// Decodes the body while keeping the envelope alongside the value
    pub fn into_decoded<T: DeserializeOwned>(self) -> Result<Decoded<T>> {
        let parsed = serde_json::from_str(&self.body);
        match parsed {
            Ok(value) => Ok(Decoded {
                response: self,
                value,
            }),
            Err(source) => Err(CacheError::Decode {
                source,
                response: self,
            }),
        }
    }
}

/// A response together with its body decoded as JSON
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub response: CachedResponse,
    pub value: T,
}
