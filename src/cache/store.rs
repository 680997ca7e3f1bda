//! Filesystem store for cached responses
//!
//! Each key maps to one `cache-<key>.txt` file holding a JSON envelope. The
//! file's modification time is the staleness clock; nothing about age is stored
//! inside the envelope.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::entry::{CachedResponse, Decoded};
use super::key::{file_name, key_from_file_name, validate_name};
use crate::config::CacheConfig;
use crate::error::{CacheError, EntryState, Result};

/// Freshness of a single entry at the time it was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No entry on disk
    Absent,
    /// Entry younger than the effective TTL
    Fresh,
    /// Entry at least as old as the effective TTL
    Stale,
}

/// Reads and writes cached responses in one directory
///
/// The store owns the on-disk representation: callers get `CachedResponse`
/// values, never file handles.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Cache directory and default TTL
    config: CacheConfig,
}

impl CacheStore {
    /// Creates a store from the cache directory and default TTL in `config`
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Creates a store for a custom directory with the default TTL
    ///
    /// Useful for testing or when a specific cache location is needed.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(&CacheConfig::default().with_cache_dir(cache_dir))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Returns the path of the cache file for `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_name(key)?;
        Ok(self.cache_dir().join(file_name(key)))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(self.cache_dir()).map_err(|e| CacheError::io(self.cache_dir(), e))
    }

    /// Modification time of the entry, `None` if there is no entry
    fn modified_time(&self, key: &str) -> Result<Option<SystemTime>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) => meta
                .modified()
                .map(Some)
                .map_err(|e| CacheError::io(&path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Returns true if an entry is persisted for `key`
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|path| path.is_file()).unwrap_or(false)
    }

    /// When the entry for `key` was last written
    pub fn last_modified(&self, key: &str) -> Result<DateTime<Utc>> {
        self.modified_time(key)?
            .map(DateTime::<Utc>::from)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Classifies the entry for `key` against the effective TTL
    ///
    /// A zero `ttl_override` selects the store's default TTL.
    pub fn freshness(&self, key: &str, ttl_override: Duration) -> Result<Freshness> {
        let Some(modified) = self.modified_time(key)? else {
            return Ok(Freshness::Absent);
        };

        let ttl = self.config.effective_ttl(ttl_override);

        // A timestamp in the future counts as age zero
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        if age < ttl {
            Ok(Freshness::Fresh)
        } else {
            Ok(Freshness::Stale)
        }
    }

    /// Decides whether the entry for `key` has to be (re)fetched
    ///
    /// # Returns
    /// * `Ok(false)` if a fresh entry exists
    /// * `Ok(true)` if the entry is absent or stale and `allow_update` is set
    /// * `Err(CacheError::PermissionDenied)` if the entry is absent or stale and
    ///   `allow_update` is not set
    pub fn check_freshness(
        &self,
        key: &str,
        ttl_override: Duration,
        allow_update: bool,
    ) -> Result<bool> {
        let state = match self.freshness(key, ttl_override)? {
            Freshness::Fresh => {
                debug!(key, "cache hit");
                return Ok(false);
            }
            Freshness::Absent => EntryState::Absent,
            Freshness::Stale => EntryState::Stale,
        };

        if allow_update {
            debug!(key, %state, "cache miss, refresh allowed");
            Ok(true)
        } else {
            warn!(key, %state, "cache miss but updates are not permitted");
            Err(CacheError::PermissionDenied {
                key: key.to_string(),
                state,
            })
        }
    }

    /// Reads the envelope for `key`
    ///
    /// # Returns
    /// * `Err(CacheError::NotFound)` if there is no entry
    /// * `Err(CacheError::Corrupt)` if the file is not a valid envelope
    pub fn read(&self, key: &str) -> Result<CachedResponse> {
        let path = self.path_for(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()))
            }
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt { path, source })
    }

    /// Reads the envelope for `key` and decodes its body as JSON into `T`
    ///
    /// A body that does not decode yields `CacheError::Decode` carrying the envelope.
    pub fn read_decoded<T: DeserializeOwned>(&self, key: &str) -> Result<Decoded<T>> {
        self.read(key)?.into_decoded()
    }

    /// Persists `response` under `key`, replacing any previous entry
    ///
    /// The envelope is written to a uniquely named temporary file in the cache
    /// directory and then renamed into place. A failed write leaves the previous
    /// entry untouched, and concurrent writers never share a temporary file.
    ///
    /// # Returns
    /// The new modification time of the entry
    pub fn write(&self, key: &str, response: &CachedResponse) -> Result<DateTime<Utc>> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        let json = serde_json::to_string(response)
            .map_err(|e| CacheError::io(&path, std::io::Error::new(ErrorKind::InvalidData, e)))?;

        // Each write gets its own temp file; dropping it on error removes it
        let mut temp = NamedTempFile::new_in(self.cache_dir())
            .map_err(|e| CacheError::io(self.cache_dir(), e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| CacheError::io(temp.path(), e))?;
        temp.persist(&path).map_err(|e| CacheError::io(&path, e.error))?;

        info!(key, path = %path.display(), status = response.status, "wrote cache entry");
        self.last_modified(key)
    }

    /// Deletes the entry for `key`
    ///
    /// Returns `false` if there was nothing to delete.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Keys of all entries currently on disk, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        let dir = match fs::read_dir(self.cache_dir()) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(self.cache_dir(), e)),
        };

        let mut keys = Vec::new();
        for dir_entry in dir {
            let dir_entry = dir_entry.map_err(|e| CacheError::io(self.cache_dir(), e))?;
            let name = dir_entry.file_name();
            if let Some(key) = name.to_str().and_then(key_from_file_name) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
