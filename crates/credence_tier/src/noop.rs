// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The canonical do-nothing tier.

use futures::future::BoxFuture;

use crate::{CacheEntry, CacheKey, Result, TierStore};

/// A tier that stores nothing and reports itself unavailable.
///
/// `NoopTier` is the uniform stand-in for a backend that is absent or
/// disabled (for example, no distributed cache configured in this
/// deployment). Every operation succeeds immediately without doing anything,
/// so callers never need to special-case a missing backend.
///
/// # Examples
///
/// ```
/// use credence_tier::{CacheKey, NoopTier, TierStore};
/// # futures::executor::block_on(async {
///
/// let tier = NoopTier;
/// assert!(!TierStore::<String>::is_available(&tier));
/// let got: Option<_> = TierStore::<String>::get(&tier, &CacheKey::from("k")).await?;
/// assert!(got.is_none());
/// # Ok::<(), credence_tier::Error>(())
/// # });
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTier;

impl<V> TierStore<V> for NoopTier
where
    V: Send + Sync,
{
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn get<'a>(&'a self, _key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>> {
        Box::pin(async { Ok(None) })
    }

    fn set<'a>(&'a self, _key: &'a CacheKey, _entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn delete<'a>(&'a self, _key: &'a CacheKey) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn len(&self) -> Option<u64> {
        Some(0)
    }
}
