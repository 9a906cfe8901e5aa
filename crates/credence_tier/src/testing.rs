// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock tier implementation for testing.
//!
//! This module provides [`MockTier`], a configurable in-memory tier that
//! records all operations and supports failure injection and availability
//! toggling, so orchestration logic can be tested against every tier edge
//! without real backends.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::{CacheEntry, CacheKey, Error, Result, TierStore};

/// Recorded tier operation with full context.
#[derive(Clone, Debug, PartialEq)]
pub enum TierOp<V> {
    /// A get was performed with the given key.
    Get(CacheKey),
    /// A set was performed with the given key and entry.
    Set {
        /// The key that was written.
        key: CacheKey,
        /// The entry that was written.
        entry: CacheEntry<V>,
    },
    /// A delete was performed with the given key.
    Delete(CacheKey),
    /// A clear was performed.
    Clear,
}

type FailPredicate<V> = Box<dyn Fn(&TierOp<V>) -> bool + Send + Sync>;

/// A configurable mock tier for testing.
///
/// Stores entries in memory, records every operation for later verification,
/// and can be told to fail operations on demand or to report itself
/// unavailable.
///
/// # Failure injection
///
/// ```
/// use credence_tier::{CacheKey, TierStore, testing::{MockTier, TierOp}};
/// # futures::executor::block_on(async {
///
/// let tier: MockTier<i32> = MockTier::new();
/// tier.fail_when(|op| matches!(op, TierOp::Get(_)));
/// assert!(tier.get(&CacheKey::from("k")).await.is_err());
/// # });
/// ```
pub struct MockTier<V> {
    name: &'static str,
    data: Arc<Mutex<HashMap<CacheKey, CacheEntry<V>>>>,
    operations: Arc<Mutex<Vec<TierOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
    available: Arc<AtomicBool>,
}

impl<V> std::fmt::Debug for MockTier<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("available", &self.available.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MockTier<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            available: Arc::clone(&self.available),
        }
    }
}

impl<V> Default for MockTier<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockTier<V> {
    /// Creates a new empty mock tier named `"mock"`.
    #[must_use]
    pub fn new() -> Self {
        Self::named("mock")
    }

    /// Creates a new empty mock tier with the given name.
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Creates a mock tier with pre-populated data.
    #[must_use]
    pub fn with_data(name: &'static str, data: HashMap<CacheKey, CacheEntry<V>>) -> Self {
        let tier = Self::named(name);
        *tier.data.lock() = data;
        tier
    }

    /// Makes the tier report itself available or unavailable.
    ///
    /// Unavailability only changes what `is_available` returns; the storage
    /// operations keep working so tests can still inspect and seed state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if the tier holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<V> MockTier<V>
where
    V: Clone,
{
    /// Returns a clone of the entry stored under `key`, if any.
    #[must_use]
    pub fn stored(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.data.lock().get(key).cloned()
    }

    /// Sets a predicate that determines when operations should fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: TierOp<V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &TierOp<V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<V> TierStore<V> for MockTier<V>
where
    V: Clone + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>> {
        Box::pin(async move {
            let op = TierOp::Get(key.clone());
            if self.should_fail(&op) {
                self.record(op);
                return Err(Error::backend("mock: get failed"));
            }
            self.record(op);
            Ok(self.data.lock().get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let op = TierOp::Set {
                key: key.clone(),
                entry: entry.clone(),
            };
            if self.should_fail(&op) {
                self.record(op);
                return Err(Error::backend("mock: set failed"));
            }
            self.record(op);
            self.data.lock().insert(key.clone(), entry);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let op = TierOp::Delete(key.clone());
            if self.should_fail(&op) {
                self.record(op);
                return Err(Error::backend("mock: delete failed"));
            }
            self.record(op);
            self.data.lock().remove(key);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let op = TierOp::Clear;
            if self.should_fail(&op) {
                self.record(op);
                return Err(Error::backend("mock: clear failed"));
            }
            self.record(op);
            self.data.lock().clear();
            Ok(())
        })
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn mock_records_operations_in_order() {
        block_on(async {
            let tier: MockTier<i32> = MockTier::new();
            let key = CacheKey::from("k");

            tier.set(&key, CacheEntry::new(1)).await.expect("set");
            let _ = tier.get(&key).await.expect("get");
            tier.delete(&key).await.expect("delete");

            let ops = tier.operations();
            assert_eq!(ops.len(), 3);
            assert!(matches!(ops[0], TierOp::Set { .. }));
            assert!(matches!(ops[1], TierOp::Get(_)));
            assert!(matches!(ops[2], TierOp::Delete(_)));
        });
    }

    #[test]
    fn fail_when_targets_specific_keys() {
        block_on(async {
            let tier: MockTier<i32> = MockTier::new();
            tier.fail_when(|op| matches!(op, TierOp::Get(k) if k.as_str() == "forbidden"));

            assert!(tier.get(&CacheKey::from("forbidden")).await.is_err());
            assert!(tier.get(&CacheKey::from("allowed")).await.is_ok());
        });
    }

    #[test]
    fn unavailable_mock_still_stores() {
        block_on(async {
            let tier: MockTier<i32> = MockTier::new();
            tier.set_available(false);
            assert!(!TierStore::is_available(&tier));

            let key = CacheKey::from("k");
            tier.set(&key, CacheEntry::new(1)).await.expect("set");
            assert!(tier.contains_key(&key));
        });
    }
}
