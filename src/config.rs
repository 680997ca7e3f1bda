//! Cache configuration
//!
//! The cache directory, default TTL and HTTP timeout are passed to the store and
//! fetcher at construction instead of living in globals.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

/// Default age after which an entry is stale
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60); // 60 min

/// Default timeout for one upstream request
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings shared by the cache store and the cached fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding the cache files
    pub cache_dir: PathBuf,
    /// TTL used when a call does not override it
    pub default_ttl: Duration,
    /// Timeout applied to each upstream request
    pub http_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            default_ttl: DEFAULT_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// `~/.cache/respcache` on Linux, or `./cache` if no home directory is known
fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "respcache")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("cache"))
}

impl CacheConfig {
    /// Loads the defaults and applies environment overrides
    ///
    /// # Environment Variables
    /// - `RESPCACHE_DIR` - Cache directory
    /// - `RESPCACHE_TTL_SECS` - Default TTL in seconds
    /// - `RESPCACHE_TIMEOUT_SECS` - HTTP timeout in seconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = env::var_os("RESPCACHE_DIR").filter(|d| !d.is_empty()) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(ttl) = secs_var("RESPCACHE_TTL_SECS") {
            config.default_ttl = ttl;
        }
        if let Some(timeout) = secs_var("RESPCACHE_TIMEOUT_SECS") {
            config.http_timeout = timeout;
        }

        config
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// TTL to apply for a per-call override; zero means "use the default"
    pub fn effective_ttl(&self, ttl_override: Duration) -> Duration {
        if ttl_override.is_zero() {
            self.default_ttl
        } else {
            ttl_override
        }
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(3600));
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert!(!config.cache_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_config_builders() {
        let config = CacheConfig::default()
            .with_cache_dir("/tmp/somewhere")
            .with_default_ttl(Duration::from_secs(5))
            .with_http_timeout(Duration::from_secs(2));

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/somewhere"));
        assert_eq!(config.default_ttl, Duration::from_secs(5));
        assert_eq!(config.http_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_effective_ttl() {
        let config = CacheConfig::default().with_default_ttl(Duration::from_secs(90));
        assert_eq!(config.effective_ttl(Duration::ZERO), Duration::from_secs(90));
        assert_eq!(
            config.effective_ttl(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }
}
