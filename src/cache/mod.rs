//! Cache module for storing HTTP responses on disk
//!
//! Keys are derived from the request (or given explicitly), each key maps to a
//! single JSON envelope file, and the file's modification time decides whether
//! the entry is still fresh.

mod entry;
pub mod key;
mod store;

pub use entry::{CachedResponse, Decoded};
pub use key::{derive_key, Headers};
pub use store::{CacheStore, Freshness};
