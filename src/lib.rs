//! respcache - a filesystem-backed, TTL-gated cache for HTTP responses
//!
//! A request either gets a previously stored response that is still fresh, or
//! is sent upstream and the result persisted, depending on whether the caller
//! is allowed to create or refresh cache entries.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod transport;

pub use cache::{derive_key, CacheStore, CachedResponse, Decoded, Freshness, Headers};
pub use config::CacheConfig;
pub use error::{CacheError, EntryState, Result};
pub use fetcher::{CacheRequest, CachedData, CachedFetcher};
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
