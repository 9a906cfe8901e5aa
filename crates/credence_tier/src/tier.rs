// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage backends.
//!
//! [`TierStore`] defines the interface that every cache backend implements.
//! The trait is object safe so that the orchestrator can hold a
//! priority-ordered list of heterogeneous tiers and treat them uniformly.

use futures::future::BoxFuture;

use crate::{CacheEntry, CacheKey, Result};

/// Trait for cache tier implementations.
///
/// Implementations report failures honestly through [`Result`]; deciding to
/// swallow a failure (skip a tier, treat an error as a miss) belongs to the
/// orchestrator, so no backend special-cases its own degradation beyond what
/// its availability check expresses.
///
/// The four storage operations are required. `is_available`, `len`, `weight`,
/// and `is_empty` have default implementations:
/// - `is_available`: returns `true` (always-on backends need no check)
/// - `len` / `weight`: return `None` (not all tiers can report cheaply)
pub trait TierStore<V>: Send + Sync {
    /// Returns the backend's name, used for statistics and log lines.
    fn name(&self) -> &'static str;

    /// Returns `true` if the backend is currently usable.
    ///
    /// Must be cheap and must never block or fail; this runs on every lookup.
    fn is_available(&self) -> bool {
        true
    }

    /// Gets the entry stored under `key`, if any.
    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>>;

    /// Stores `entry` under `key`. The entry carries its own absolute expiry.
    fn set<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>>;

    /// Removes the entry stored under `key`, if any.
    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<()>>;

    /// Removes all entries held by this tier.
    fn clear(&self) -> BoxFuture<'_, Result<()>>;

    /// Returns the number of stored entries, if the backend can report it
    /// without a round trip.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no entries, when size is reported.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    /// Returns the approximate resident size in bytes, if tracked.
    fn weight(&self) -> Option<u64> {
        None
    }
}

impl<V, T> TierStore<V> for std::sync::Arc<T>
where
    T: TierStore<V> + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>> {
        (**self).get(key)
    }

    fn set<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>> {
        (**self).set(key, entry)
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<()>> {
        (**self).delete(key)
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        (**self).clear()
    }

    fn len(&self) -> Option<u64> {
        (**self).len()
    }

    fn weight(&self) -> Option<u64> {
        (**self).weight()
    }
}
