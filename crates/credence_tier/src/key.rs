// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache key derivation.
//!
//! Natural identifiers (usually URLs) are mapped to canonical [`CacheKey`]s
//! that are stable across processes, safe for every backend, and bounded in
//! length. Distinct logical caches sharing one physical backend are kept
//! apart by a namespace tag in front of every key.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Default ceiling on the encoded portion of a derived key.
///
/// Natural keys whose base64 form exceeds this fall back to a fixed-width
/// digest, so derived keys stay comfortably inside backend key-length limits.
pub const DEFAULT_MAX_ENCODED_LEN: usize = 220;

/// A canonical cache key.
///
/// Keys are normally produced by [`KeyDeriver::derive`]; the `From`
/// conversions exist for tests and tooling that address storage directly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns the SHA-256 hex digest of the key text.
    ///
    /// This is the `urlHash` field of the wire record, a fixed-width handle
    /// for the key usable in indexes and log correlation.
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for CacheKey {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

/// Derives canonical cache keys from natural identifiers.
///
/// Derivation is a pure, deterministic, total function: the same natural key
/// always yields the same [`CacheKey`], and distinct natural keys yield
/// distinct cache keys (exactly, for short keys that stay reversible; with
/// overwhelming probability for long keys that fall back to a digest).
///
/// # Examples
///
/// ```
/// use credence_tier::KeyDeriver;
///
/// let keys = KeyDeriver::new("analysis");
/// let key = keys.derive("https://news.example/article/1");
/// assert!(key.as_str().starts_with("analysis:"));
/// assert_eq!(key, keys.derive("https://news.example/article/1"));
/// ```
#[derive(Clone, Debug)]
pub struct KeyDeriver {
    namespace: &'static str,
    max_encoded_len: usize,
}

impl KeyDeriver {
    /// Creates a deriver for the given logical cache namespace.
    #[must_use]
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            max_encoded_len: DEFAULT_MAX_ENCODED_LEN,
        }
    }

    /// Overrides the ceiling on the encoded portion of derived keys.
    #[must_use]
    pub fn with_max_encoded_len(mut self, max_encoded_len: usize) -> Self {
        self.max_encoded_len = max_encoded_len;
        self
    }

    /// Returns the namespace tag this deriver prefixes onto every key.
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Derives the canonical key for a natural identifier.
    ///
    /// Short identifiers are kept reversible (URL-safe base64); identifiers
    /// whose encoding would exceed the configured ceiling are digested
    /// instead, keeping key length bounded.
    #[must_use]
    pub fn derive(&self, natural_key: &str) -> CacheKey {
        let encoded = URL_SAFE_NO_PAD.encode(natural_key.as_bytes());
        let text = if encoded.len() <= self.max_encoded_len {
            format!("{}:{encoded}", self.namespace)
        } else {
            let digest = hex::encode(Sha256::digest(natural_key.as_bytes()));
            format!("{}:sha256:{digest}", self.namespace)
        };
        CacheKey(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let keys = KeyDeriver::new("analysis");
        assert_eq!(keys.derive("https://a.example/1"), keys.derive("https://a.example/1"));
    }

    #[test]
    fn namespaces_do_not_collide() {
        let natural = "https://a.example/1";
        assert_ne!(
            KeyDeriver::new("analysis").derive(natural),
            KeyDeriver::new("challenge").derive(natural)
        );
    }

    #[test]
    fn long_keys_fall_back_to_digest() {
        let keys = KeyDeriver::new("analysis");
        let natural = "https://a.example/".repeat(64);
        let key = keys.derive(&natural);
        assert!(key.as_str().starts_with("analysis:sha256:"));
        assert!(key.as_str().len() < 100);
    }

    #[test]
    fn derived_keys_use_backend_safe_characters() {
        let keys = KeyDeriver::new("analysis");
        let key = keys.derive("https://a.example/path?q=1&r=2#frag");
        assert!(
            key.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_'))
        );
    }

    #[test]
    fn digest_is_fixed_width_hex() {
        let key = KeyDeriver::new("analysis").derive("https://a.example/1");
        let digest = key.digest();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
