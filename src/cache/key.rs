//! Cache key derivation using FNV-1a hashes

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::{CacheError, Result};

/// Request headers, one entry per header name with all of its values
///
/// A `BTreeMap` keeps names sorted, which makes the canonical request string
/// independent of the order headers were inserted in.
pub type Headers = BTreeMap<String, Vec<String>>;

const FILE_PREFIX: &str = "cache-";
const FILE_SUFFIX: &str = ".txt";

/// FNV-1a, 32-bit
fn fnv1a_hash(data: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Renders headers as `name="v1, v2"` lines, ordered by name
fn canonical_headers(headers: &Headers) -> String {
    let mut out = String::new();
    for (name, values) in headers {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{}=\"{}\"", name, values.join(", "));
    }
    out
}

/// The string that is hashed to produce a request's key
pub fn canonical_request(method: &str, url: &str, headers: &Headers) -> String {
    format!("{}{}{}", method, url, canonical_headers(headers))
}

/// Generate a deterministic cache key from method, URL and headers.
///
/// The key is the decimal FNV-1a hash of the canonical request string.
pub fn derive_key(method: &str, url: &str, headers: &Headers) -> String {
    fnv1a_hash(canonical_request(method, url, headers).as_bytes()).to_string()
}

/// Checks that a caller-supplied cache name can be used as part of a file name
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(CacheError::InvalidKey(name.to_string()));
    }
    Ok(())
}

/// File name holding the entry for `key`
pub fn file_name(key: &str) -> String {
    format!("{}{}{}", FILE_PREFIX, key, FILE_SUFFIX)
}

/// Recovers the key from a cache file name, if it is one
pub fn key_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        headers
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a_hash(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_hash(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_hash(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_derive_key_deterministic() {
        let key1 = derive_key("GET", "https://example.test/a", &Headers::new());
        let key2 = derive_key("GET", "https://example.test/a", &Headers::new());
        assert_eq!(key1, key2);
        assert!(key1.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_derive_key_ignores_header_insertion_order() {
        let mut first = Headers::new();
        first.insert("Accept".to_string(), vec!["application/json".to_string()]);
        first.insert("X-Api-Key".to_string(), vec!["secret".to_string()]);

        let mut second = Headers::new();
        second.insert("X-Api-Key".to_string(), vec!["secret".to_string()]);
        second.insert("Accept".to_string(), vec!["application/json".to_string()]);

        assert_eq!(
            derive_key("GET", "https://example.test/a", &first),
            derive_key("GET", "https://example.test/a", &second)
        );
    }

    #[test]
    fn test_derive_key_different_inputs() {
        let none = Headers::new();
        let base = derive_key("GET", "https://example.test/a", &none);

        assert_ne!(base, derive_key("POST", "https://example.test/a", &none));
        assert_ne!(base, derive_key("GET", "https://example.test/b", &none));
        assert_ne!(
            base,
            derive_key(
                "GET",
                "https://example.test/a",
                &headers(&[("Accept", "text/plain")])
            )
        );
    }

    #[test]
    fn test_canonical_request_sorts_headers() {
        let h = headers(&[("b", "2"), ("a", "1"), ("a", "1b")]);
        assert_eq!(
            canonical_request("GET", "u", &h),
            "GETua=\"1, 1b\"\nb=\"2\"\n"
        );
    }

    #[test]
    fn test_file_name_roundtrip() {
        assert_eq!(file_name("shared"), "cache-shared.txt");
        assert_eq!(key_from_file_name("cache-shared.txt"), Some("shared"));
        assert_eq!(key_from_file_name("cache-.txt"), None);
        assert_eq!(key_from_file_name("notes.txt"), None);
        assert_eq!(key_from_file_name(".tmpA1b2C3"), None);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("shared").is_ok());
        assert!(validate_name("tides_kitsilano-2024").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }
}
