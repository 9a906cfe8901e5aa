// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The in-process tier implementation.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use futures::future::BoxFuture;
use parking_lot::Mutex;

use credence_tier::{CacheEntry, CacheKey, Result, TierStore};

use crate::builder::{MemoryTierBuilder, Weigher};

struct Slot<V> {
    entry: CacheEntry<V>,
    last_access: Instant,
    weight: u64,
}

/// The fast, process-local cache tier.
///
/// Entries live in a guarded map. Expiry is enforced lazily: an expired entry
/// is removed and reported absent the next time it is read. Each hit
/// increments the entry's hit count in place and refreshes its access time,
/// which also drives least-recently-used eviction when a capacity bound is
/// configured.
///
/// Cloning the tier is cheap and shares the underlying storage, so the same
/// instance can be handed to a cache chain and inspected from tests.
pub struct MemoryTier<V> {
    name: &'static str,
    slots: Arc<Mutex<HashMap<CacheKey, Slot<V>>>>,
    max_capacity: Option<u64>,
    weigher: Option<Weigher<V>>,
    total_weight: Arc<AtomicU64>,
}

impl<V> std::fmt::Debug for MemoryTier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("name", &self.name)
            .field("len", &self.slots.lock().len())
            .field("max_capacity", &self.max_capacity)
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MemoryTier<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            slots: Arc::clone(&self.slots),
            max_capacity: self.max_capacity,
            weigher: self.weigher.clone(),
            total_weight: Arc::clone(&self.total_weight),
        }
    }
}

impl<V> Default for MemoryTier<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryTier<V> {
    /// Creates a new unbounded memory tier.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new memory tier bounded to `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring a memory tier.
    #[must_use]
    pub fn builder() -> MemoryTierBuilder<V> {
        MemoryTierBuilder::new()
    }

    pub(crate) fn from_builder(builder: MemoryTierBuilder<V>) -> Self {
        Self {
            name: builder.name,
            slots: Arc::new(Mutex::new(HashMap::new())),
            max_capacity: builder.max_capacity,
            weigher: builder.weigher,
            total_weight: Arc::new(AtomicU64::new(0)),
        }
    }

    fn weight_of(&self, value: &V) -> u64 {
        self.weigher.as_ref().map_or(0, |weigher| weigher(value) as u64)
    }

    /// Evicts entries until an insert keeps the map within capacity.
    /// Expired entries go first; after that, the least recently accessed.
    fn make_room(&self, slots: &mut HashMap<CacheKey, Slot<V>>) {
        let Some(max_capacity) = self.max_capacity else {
            return;
        };

        if (slots.len() as u64) >= max_capacity {
            let expired: Vec<CacheKey> = slots
                .iter()
                .filter(|(_, slot)| slot.entry.is_expired())
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                if let Some(slot) = slots.remove(&key) {
                    self.total_weight.fetch_sub(slot.weight, Ordering::Relaxed);
                }
            }
        }

        while (slots.len() as u64) >= max_capacity {
            // Linear scan; bounded tiers are expected to be small.
            let Some(coldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(key, _)| key.clone())
            else {
                return;
            };
            if let Some(slot) = slots.remove(&coldest) {
                self.total_weight.fetch_sub(slot.weight, Ordering::Relaxed);
            }
        }
    }
}

impl<V> TierStore<V> for MemoryTier<V>
where
    V: Clone + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>> {
        Box::pin(async move {
            let mut slots = self.slots.lock();
            let Some(slot) = slots.get_mut(key) else {
                return Ok(None);
            };

            if slot.entry.is_expired() {
                let weight = slot.weight;
                slots.remove(key);
                self.total_weight.fetch_sub(weight, Ordering::Relaxed);
                return Ok(None);
            }

            slot.entry.record_hit();
            slot.last_access = Instant::now();
            Ok(Some(slot.entry.clone()))
        })
    }

    fn set<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let weight = self.weight_of(entry.value());
            let mut slots = self.slots.lock();

            if !slots.contains_key(key) {
                self.make_room(&mut slots);
            }

            let slot = Slot {
                entry,
                last_access: Instant::now(),
                weight,
            };
            if let Some(previous) = slots.insert(key.clone(), slot) {
                self.total_weight.fetch_sub(previous.weight, Ordering::Relaxed);
            }
            self.total_weight.fetch_add(weight, Ordering::Relaxed);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(slot) = self.slots.lock().remove(key) {
                self.total_weight.fetch_sub(slot.weight, Ordering::Relaxed);
            }
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.slots.lock().clear();
            self.total_weight.store(0, Ordering::Relaxed);
            Ok(())
        })
    }

    fn len(&self) -> Option<u64> {
        Some(self.slots.lock().len() as u64)
    }

    fn weight(&self) -> Option<u64> {
        self.weigher
            .as_ref()
            .map(|_| self.total_weight.load(Ordering::Relaxed))
    }
}
