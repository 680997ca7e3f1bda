//! Command-line interface parsing for respcache
//!
//! Translates arguments into `CacheRequest`s; all caching behaviour lives in
//! the library.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::fetcher::CacheRequest;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `-H` value that is not `Name: value`
    #[error("Invalid header: '{0}'. Expected 'Name: value'")]
    InvalidHeader(String),
}

/// respcache - fetch HTTP responses through a local TTL cache
#[derive(Parser, Debug)]
#[command(name = "respcache")]
#[command(about = "Fetch HTTP responses through a filesystem cache with TTL")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache files (overrides RESPCACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log cache decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Return the cached response, fetching it when absent or stale
    Fetch(FetchArgs),
    /// Show a cached entry without making a request
    Inspect(InspectArgs),
    /// Print the cache key derived from a request
    Key(RequestArgs),
    /// Delete one cached entry
    Clear {
        /// Cache key or custom name
        name: String,
    },
    /// List the keys of all cached entries
    List,
}

/// Method, URL and headers of a request
#[derive(Args, Debug)]
pub struct RequestArgs {
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request header, may be repeated
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// TTL in seconds, 0 uses the default
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    pub ttl: u64,

    /// Only serve from the cache; fail if the entry is absent or stale
    #[arg(long)]
    pub read_only: bool,

    /// Cache under this name instead of the derived key
    #[arg(long)]
    pub name: Option<String>,

    /// Print the body decoded as JSON instead of the envelope
    #[arg(long)]
    pub decode: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Cache key or custom name
    pub name: String,

    /// TTL in seconds, 0 uses the default
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    pub ttl: u64,

    /// Fail if the entry is absent or stale
    #[arg(long)]
    pub read_only: bool,
}

/// Parses a `Name: value` header argument
pub fn parse_header(s: &str) -> Result<(String, String), CliError> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| CliError::InvalidHeader(s.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidHeader(s.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl RequestArgs {
    pub fn to_request(&self) -> Result<CacheRequest, CliError> {
        let mut request = CacheRequest::new(self.method.to_uppercase(), &self.url);
        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            request = request.with_header(name, value);
        }
        Ok(request)
    }
}

impl FetchArgs {
    pub fn to_request(&self) -> Result<CacheRequest, CliError> {
        let mut request = self
            .request
            .to_request()?
            .with_ttl(Duration::from_secs(self.ttl))
            .allow_update(!self.read_only);
        if let Some(name) = &self.name {
            request = request.with_name(name);
        }
        Ok(request)
    }
}
