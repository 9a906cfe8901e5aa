// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The serialized wire shape shared by out-of-process tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CacheEntry, CacheKey};

/// The wire envelope for a cache entry.
///
/// Distributed and persistent tiers store this shape (as JSON) rather than
/// raw payloads, so that any tier implementation round-trips the same record:
/// the key it was stored under, a fixed-width hash of that key, the payload,
/// ISO-8601 timestamps, and the hit count.
///
/// # Examples
///
/// ```
/// use credence_tier::{CacheEntry, CacheKey, CacheRecord};
///
/// let key = CacheKey::from("analysis:abc");
/// let record = CacheRecord::from_entry(&key, CacheEntry::new("payload".to_string()));
/// let json = serde_json::to_string(&record).unwrap();
/// assert!(json.contains("\"urlHash\""));
/// assert!(json.contains("\"cachedAt\""));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord<V> {
    /// The canonical cache key this record was stored under.
    pub key: String,
    /// SHA-256 hex digest of the key text.
    pub url_hash: String,
    /// The cached payload.
    pub payload: V,
    /// When the payload was cached.
    pub cached_at: DateTime<Utc>,
    /// When the record stops being servable, if ever.
    pub expires_at: Option<DateTime<Utc>>,
    /// How many times this stored copy has been served.
    pub hit_count: u64,
}

impl<V> CacheRecord<V> {
    /// Builds the wire record for an entry stored under `key`.
    pub fn from_entry(key: &CacheKey, entry: CacheEntry<V>) -> Self {
        let cached_at = entry.cached_at();
        let expires_at = entry.expires_at();
        let hit_count = entry.hit_count();
        Self {
            key: key.as_str().to_owned(),
            url_hash: key.digest(),
            payload: entry.into_value(),
            cached_at,
            expires_at,
            hit_count,
        }
    }

    /// Converts the record back into its key and entry.
    pub fn into_entry(self) -> (CacheKey, CacheEntry<V>) {
        let key = CacheKey::from(self.key);
        let entry = CacheEntry::from_parts(self.payload, self.cached_at, self.expires_at, self.hit_count);
        (key, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyDeriver;
    use std::time::Duration;

    #[test]
    fn record_round_trips_losslessly_through_json() {
        let key = KeyDeriver::new("analysis").derive("https://a.example/1");
        let mut entry = CacheEntry::with_ttl("payload".to_string(), Duration::from_secs(60));
        entry.record_hit();

        let record = CacheRecord::from_entry(&key, entry.clone());
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: CacheRecord<String> = serde_json::from_str(&json).expect("deserialize");
        let (parsed_key, parsed_entry) = parsed.into_entry();

        assert_eq!(parsed_key, key);
        assert_eq!(parsed_entry, entry);
    }

    #[test]
    fn url_hash_matches_key_digest() {
        let key = CacheKey::from("analysis:abc");
        let record = CacheRecord::from_entry(&key, CacheEntry::new(1));
        assert_eq!(record.url_hash, key.digest());
    }
}
