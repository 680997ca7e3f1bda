//! Cached fetcher
//!
//! Ties key derivation, the cache store and the upstream transport together:
//! serve a fresh entry when there is one, otherwise fetch and persist it if the
//! caller is allowed to update the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::cache::{derive_key, key, CacheStore, CachedResponse, Decoded, Headers};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::transport::{HttpTransport, Transport};

/// One request as seen by the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    /// HTTP method, e.g. "GET"
    pub method: String,
    pub url: String,
    pub headers: Headers,
    /// TTL override; zero selects the configured default
    pub ttl: Duration,
    /// Whether an absent or stale entry may be (re)created
    pub allow_update: bool,
    /// Explicit cache name used instead of the derived key
    pub name: Option<String>,
}

impl CacheRequest {
    /// A request with no headers, the default TTL and updates allowed
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            ttl: Duration::ZERO,
            allow_update: true,
            name: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Adds one header value; repeated names accumulate values
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn allow_update(mut self, allow_update: bool) -> Self {
        self.allow_update = allow_update;
        self
    }

    /// Only serve from the cache, never create or refresh entries
    pub fn read_only(self) -> Self {
        self.allow_update(false)
    }

    /// Cache under an explicit name; the caller is responsible for uniqueness
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The custom name if one was given, otherwise the key derived from the request
    pub fn cache_key(&self) -> Result<String> {
        match &self.name {
            Some(name) => {
                key::validate_name(name)?;
                Ok(name.clone())
            }
            None => Ok(derive_key(&self.method, &self.url, &self.headers)),
        }
    }
}

/// Result of inspecting the cache without touching the network
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the entry was written
    pub modified_at: DateTime<Utc>,
    /// Whether the entry has reached its TTL
    pub is_stale: bool,
}

/// One async mutex per key, so a key is refreshed by a single caller at a time
#[derive(Debug, Default)]
struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Drop locks nobody is holding or waiting on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Serves HTTP responses from the filesystem cache, fetching when permitted
///
/// Concurrent `fetch` calls for the same key within one process are
/// serialized, so at most one of them goes upstream. Separate processes
/// sharing a cache directory are not coordinated.
pub struct CachedFetcher<T = HttpTransport> {
    store: CacheStore,
    transport: T,
    http_timeout: Duration,
    locks: KeyLocks,
}

impl CachedFetcher<HttpTransport> {
    /// Creates a fetcher that uses reqwest for upstream requests
    pub fn new(config: CacheConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }
}

impl<T: Transport> CachedFetcher<T> {
    pub fn with_transport(config: CacheConfig, transport: T) -> Self {
        Self {
            store: CacheStore::new(&config),
            transport,
            http_timeout: config.http_timeout,
            locks: KeyLocks::default(),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Returns the cached response for `request`, fetching it if needed
    ///
    /// # Returns
    /// * The fresh entry if there is one, regardless of `allow_update`
    /// * A newly fetched and persisted entry if the entry is absent or stale and
    ///   `allow_update` is set
    /// * `Err(CacheError::PermissionDenied)` if the entry is absent or stale and
    ///   `allow_update` is not set
    /// * `Err(CacheError::Upstream)` if the request failed; the cache is left as it was
    pub async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse> {
        let key = request.cache_key()?;

        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;

        let needs_refresh =
            self.store
                .check_freshness(&key, request.ttl, request.allow_update)?;

        if !needs_refresh {
            return self.store.read(&key);
        }

        debug!(key = %key, method = %request.method, url = %request.url, "fetching upstream");
        let raw = self
            .transport
            .perform(
                &request.method,
                &request.url,
                &request.headers,
                self.http_timeout,
            )
            .await
            .map_err(|e| {
                warn!(key = %key, url = %request.url, error = %e, "upstream request failed");
                CacheError::Upstream(e)
            })?;

        let response = CachedResponse::new(raw.status, raw.body);
        self.store.write(&key, &response)?;
        Ok(response)
    }

    /// Like [`fetch`](Self::fetch), then decodes the body as JSON into `R`
    ///
    /// A body that does not decode yields `CacheError::Decode` carrying the
    /// envelope, which stays cached either way.
    pub async fn fetch_decoded<R: DeserializeOwned>(
        &self,
        request: &CacheRequest,
    ) -> Result<Decoded<R>> {
        self.fetch(request).await?.into_decoded()
    }

    /// Reads the entry for `key` without ever going upstream
    ///
    /// Applies the same permission rules as `fetch`: an absent or stale entry
    /// with `allow_update` unset is `PermissionDenied`. With `allow_update` set,
    /// a stale entry is returned with `is_stale = true` and an absent one is
    /// `NotFound`.
    pub fn inspect(
        &self,
        key: &str,
        ttl: Duration,
        allow_update: bool,
    ) -> Result<CachedData<CachedResponse>> {
        let is_stale = self.store.check_freshness(key, ttl, allow_update)?;
        let data = self.store.read(key)?;
        let modified_at = self.store.last_modified(key)?;

        Ok(CachedData {
            data,
            modified_at,
            is_stale,
        })
    }

    /// Like [`inspect`](Self::inspect), with the body decoded as JSON into `R`
    pub fn inspect_decoded<R: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
        allow_update: bool,
    ) -> Result<CachedData<Decoded<R>>> {
        let inspected = self.inspect(key, ttl, allow_update)?;
        Ok(CachedData {
            data: inspected.data.into_decoded()?,
            modified_at: inspected.modified_at,
            is_stale: inspected.is_stale,
        })
    }
}
