// Copyright (c) Microsoft Corporation.

use std::{ops::Deref, time::Duration};

use chrono::{DateTime, Utc};

/// A cached value with its lifecycle metadata.
///
/// `CacheEntry` wraps a payload with the timestamp it was cached at, an
/// optional absolute expiry, and a hit counter. Every tier holds its own copy
/// of an entry; there is no shared mutable state across tiers.
///
/// Expiry is absolute rather than relative so that an entry can be written to
/// an out-of-process backend and judged consistently by any reader.
///
/// # Examples
///
/// ```
/// use credence_tier::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(42);
/// assert_eq!(*entry.value(), 42);
/// assert!(!entry.is_expired());
///
/// let entry = CacheEntry::with_ttl("data".to_string(), Duration::from_secs(60));
/// assert!(entry.expires_at().is_some());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    hit_count: u64,
}

impl<V> CacheEntry<V> {
    /// Creates an entry with the given value and no expiry.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            expires_at: None,
            hit_count: 0,
        }
    }

    /// Creates an entry that expires `ttl` from now.
    ///
    /// A TTL too large to represent as an absolute timestamp leaves the entry
    /// without a practical expiry.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        let mut entry = Self::new(value);
        entry.expires_at = expiry_from(entry.cached_at, ttl);
        entry
    }

    /// Recreates an entry from stored fields.
    ///
    /// This is used when rehydrating entries from a persistent or distributed
    /// backend; [`CacheEntry::new`] is the constructor for fresh values.
    pub fn from_parts(value: V, cached_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>, hit_count: u64) -> Self {
        Self {
            value,
            cached_at,
            expires_at,
            hit_count,
        }
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the timestamp when this entry was cached.
    #[must_use]
    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    /// Returns the absolute expiry, if the entry has one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the number of times this copy of the entry has been served.
    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Records one more hit against this entry.
    pub fn record_hit(&mut self) {
        self.hit_count = self.hit_count.saturating_add(1);
    }

    /// Returns `true` if the entry is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns `true` if the entry is expired as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Returns the time left until expiry, or `None` if the entry does not
    /// expire. An already-expired entry reports a zero remainder.
    #[must_use]
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<V> From<V> for CacheEntry<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

fn expiry_from(cached_at: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl).ok()?;
    cached_at.checked_add_signed(ttl)
}
