// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalesces duplicate in-flight computations into a single execution.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Weak},
};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

/// A per-key single-flight guard.
///
/// When multiple callers request the same work (identified by a key) while a
/// computation for that key is already in flight, only the first caller (the
/// leader) executes the work; the others attach as followers and receive a
/// clone of the leader's result. Once the result is delivered the in-flight
/// record is cleared, so a later call for the same key starts a fresh
/// computation — failures are shared with the waiters of that window but
/// never remembered beyond it.
///
/// The registry check-and-insert happens under a synchronous lock with no
/// suspension point, so at most one in-flight record can exist per key at any
/// instant, on any runtime.
///
/// If the leader is cancelled before producing a result, the next waiting
/// follower is promoted and runs its own copy of the work, so a vanished
/// leader cannot wedge a key.
///
/// # Examples
///
/// ```
/// use credence::SingleFlight;
/// # futures::executor::block_on(async {
///
/// let flight: SingleFlight<String, u32> = SingleFlight::new();
/// let value = flight.run("answer".to_string(), || async { 42 }).await;
/// assert_eq!(value, 42);
/// # });
/// ```
pub struct SingleFlight<K, T> {
    inflight: SyncMutex<HashMap<K, Weak<FlightSlot<T>>>>,
}

struct FlightSlot<T> {
    slot: AsyncMutex<Option<T>>,
}

impl<K, T> std::fmt::Debug for SingleFlight<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").finish_non_exhaustive()
    }
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            inflight: SyncMutex::new(HashMap::new()),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Clone + Eq + Hash,
    T: Clone,
{
    /// Creates a new guard with no in-flight computations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` for `key`, coalescing with any computation already in
    /// flight for the same key.
    ///
    /// Exactly one copy of the work executes per in-flight window; every
    /// caller of that window receives a clone of the same result.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.join(&key);

        // Leaders hold this lock while executing, so followers block here
        // until a result is stored.
        let mut guard = slot.slot.lock().await;
        if let Some(result) = guard.as_ref() {
            return result.clone();
        }

        // The slot is empty and we hold it: we are the leader, either as the
        // first caller or as a follower promoted after the leader vanished.
        let result = work().await;
        *guard = Some(result.clone());

        // Clear the in-flight record before waking followers, so a caller
        // arriving after resolution starts a fresh computation.
        self.inflight.lock().remove(&key);
        drop(guard);
        result
    }

    /// Returns the in-flight slot for `key`, creating it if absent.
    /// Check-and-insert is atomic with respect to the async scheduler.
    fn join(&self, key: &K) -> Arc<FlightSlot<T>> {
        let mut inflight = self.inflight.lock();
        if let Some(existing) = inflight.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        let slot = Arc::new(FlightSlot {
            slot: AsyncMutex::new(None),
        });
        inflight.insert(key.clone(), Arc::downgrade(&slot));
        slot
    }
}
