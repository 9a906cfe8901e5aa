// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The multi-tier get-or-compute engine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use credence_tier::{CacheEntry, CacheKey, KeyDeriver, TierStore};

use crate::{
    builder::CacheBuilder,
    error::ComputeError,
    flight::SingleFlight,
    lookup::{Lookup, LookupSource},
    stats::{CacheStats, StatsCollector},
};

/// One registered tier: its store, resolved TTL, and display name.
pub(crate) struct TierSlot<V> {
    pub(crate) store: Arc<dyn TierStore<V>>,
    pub(crate) name: &'static str,
    pub(crate) ttl: Duration,
}

impl<V> Clone for TierSlot<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            ttl: self.ttl,
        }
    }
}

/// A multi-tier cache fronting an expensive computation.
///
/// `Cache` probes its tiers in strict priority order. The first hit wins,
/// back-fills every faster tier in the background, and is returned tagged
/// with the tier it came from. When every tier misses, the computation runs
/// under a per-key single-flight guard — concurrent requests for the same key
/// share one execution — and the fresh result is written to every available
/// tier with that tier's own TTL.
///
/// Tier failures never surface: an unavailable or failing tier is skipped
/// (logged, counted as a miss) and the chain continues, degrading at worst to
/// a fresh computation. Only a failure of the computation itself reaches the
/// caller.
///
/// The cache's name doubles as the key namespace, so distinct logical caches
/// sharing physical backends cannot collide.
///
/// Back-fill writes are spawned on the ambient tokio runtime; without one
/// they are skipped, which only costs the next lookup a slower hit.
///
/// # Examples
///
/// ```
/// use credence::{Cache, MemoryTier};
/// # futures::executor::block_on(async {
///
/// let cache: Cache<String> = Cache::builder("analysis").tier(MemoryTier::new()).build();
///
/// let looked_up = cache
///     .get_or_compute("https://news.example/article", || async {
///         Ok::<_, std::io::Error>("mostly reliable".to_string())
///     })
///     .await?;
/// assert!(!looked_up.is_cached());
///
/// let looked_up = cache
///     .get_or_compute("https://news.example/article", || async {
///         Ok::<_, std::io::Error>("never computed".to_string())
///     })
///     .await?;
/// assert!(looked_up.is_cached());
/// assert_eq!(looked_up.value, "mostly reliable");
/// # Ok::<(), credence::ComputeError>(())
/// # });
/// ```
pub struct Cache<V> {
    name: &'static str,
    keys: KeyDeriver,
    tiers: Vec<TierSlot<V>>,
    flight: SingleFlight<CacheKey, Result<V, ComputeError>>,
    stats: Arc<StatsCollector>,
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("tiers", &self.tiers.iter().map(|slot| slot.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new cache builder for the given logical cache name.
    ///
    /// The name namespaces every derived key and identifies the cache in
    /// statistics and log lines.
    #[must_use]
    pub fn builder(name: &'static str) -> CacheBuilder<V> {
        CacheBuilder::new(name)
    }

    pub(crate) fn new(name: &'static str, tiers: Vec<TierSlot<V>>) -> Self {
        let stats = StatsCollector::new(tiers.iter().map(|slot| slot.name));
        Self {
            name,
            keys: KeyDeriver::new(name),
            tiers,
            flight: SingleFlight::new(),
            stats: Arc::new(stats),
        }
    }

    /// Returns the logical cache name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the value for `natural_key`, computing it on a full miss.
    ///
    /// Tiers are probed in priority order; the first unexpired hit is
    /// returned immediately, tagged with its tier, while faster tiers are
    /// back-filled in the background. On a full miss, `compute` runs under
    /// the per-key single-flight guard, so concurrent callers for the same
    /// key share a single execution, and the fresh value is written to every
    /// available tier with that tier's TTL.
    ///
    /// # Errors
    ///
    /// Returns an error only if `compute` fails. The failure is shared with
    /// every caller coalesced into the same flight, nothing is written to any
    /// tier, and the next call for this key will run `compute` again.
    pub async fn get_or_compute<F, Fut, E>(&self, natural_key: &str, compute: F) -> Result<Lookup<V>, ComputeError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let key = self.keys.derive(natural_key);

        if let Some((index, entry)) = self.probe(&key).await {
            self.stats.record_cache_hit();
            self.backfill(index, &key, &entry);
            return Ok(Lookup {
                value: entry.into_value(),
                source: LookupSource::Tier(self.tiers[index].name),
            });
        }

        self.stats.record_cache_miss();
        let outcome = self
            .flight
            .run(key.clone(), || {
                let key = &key;
                async move {
                    match compute().await {
                        Ok(value) => {
                            self.write_through(key, &value).await;
                            Ok(value)
                        }
                        Err(error) => Err(ComputeError::new(error)),
                    }
                }
            })
            .await;

        Ok(Lookup {
            value: outcome?,
            source: LookupSource::Computed,
        })
    }

    /// Returns the cached value for `natural_key`, if any tier holds it.
    ///
    /// The hit path is identical to [`get_or_compute`](Self::get_or_compute),
    /// including back-fill; a full miss simply returns `None`.
    pub async fn get(&self, natural_key: &str) -> Option<Lookup<V>> {
        let key = self.keys.derive(natural_key);
        match self.probe(&key).await {
            Some((index, entry)) => {
                self.stats.record_cache_hit();
                self.backfill(index, &key, &entry);
                Some(Lookup {
                    value: entry.into_value(),
                    source: LookupSource::Tier(self.tiers[index].name),
                })
            }
            None => {
                self.stats.record_cache_miss();
                None
            }
        }
    }

    /// Removes `natural_key` from every tier, best effort.
    pub async fn invalidate(&self, natural_key: &str) {
        let key = self.keys.derive(natural_key);
        let deletes = self.tiers.iter().filter(|slot| slot.store.is_available()).map(|slot| {
            let key = &key;
            async move {
                if let Err(error) = slot.store.delete(key).await {
                    warn!(cache = self.name, tier = slot.name, %error, "invalidate failed");
                }
            }
        });
        futures::future::join_all(deletes).await;
    }

    /// Clears every tier, best effort.
    pub async fn clear(&self) {
        let clears = self.tiers.iter().filter(|slot| slot.store.is_available()).map(|slot| async move {
            if let Err(error) = slot.store.clear().await {
                warn!(cache = self.name, tier = slot.name, %error, "clear failed");
            }
        });
        futures::future::join_all(clears).await;
    }

    /// Returns a read-only snapshot of the cache's accounting.
    ///
    /// `total_keys` and `memory_usage` aggregate whatever the tiers can
    /// report cheaply; tiers that cannot contribute `0`.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let total_keys = self.tiers.iter().filter_map(|slot| slot.store.len()).sum();
        let mut weight = None;
        for slot in &self.tiers {
            if let Some(bytes) = slot.store.weight() {
                weight = Some(weight.unwrap_or(0) + bytes);
            }
        }
        self.stats.snapshot(total_keys, weight)
    }

    /// Probes the tiers in priority order, returning the first unexpired hit.
    ///
    /// Failures and expired copies count as misses for that tier; probing is
    /// never parallelized, so a fast-tier hit costs exactly one probe.
    async fn probe(&self, key: &CacheKey) -> Option<(usize, CacheEntry<V>)> {
        for (index, slot) in self.tiers.iter().enumerate() {
            if !slot.store.is_available() {
                debug!(cache = self.name, tier = slot.name, "skipping unavailable tier");
                continue;
            }
            match slot.store.get(key).await {
                Ok(Some(entry)) => {
                    if entry.is_expired() {
                        // A stale copy the backend has not reclaimed yet.
                        self.stats.record_tier_miss(slot.name);
                        continue;
                    }
                    self.stats.record_tier_hit(slot.name);
                    return Some((index, entry));
                }
                Ok(None) => self.stats.record_tier_miss(slot.name),
                Err(error) => {
                    warn!(cache = self.name, tier = slot.name, %error, "tier lookup failed");
                    self.stats.record_tier_miss(slot.name);
                }
            }
        }
        None
    }

    /// Propagates a slower-tier hit into every faster tier, fire-and-forget.
    ///
    /// Each target tier gets a fresh entry under its own TTL. The writes run
    /// in the background and cannot delay or fail the response; without an
    /// ambient runtime they are skipped entirely.
    fn backfill(&self, hit_index: usize, key: &CacheKey, entry: &CacheEntry<V>) {
        if hit_index == 0 {
            return;
        }
        let faster: Vec<TierSlot<V>> = self.tiers[..hit_index]
            .iter()
            .filter(|slot| slot.store.is_available())
            .cloned()
            .collect();
        if faster.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(cache = self.name, "no runtime for back-fill, skipping");
            return;
        };

        let cache_name = self.name;
        let stats = Arc::clone(&self.stats);
        let key = key.clone();
        let payload = entry.value().clone();
        runtime.spawn(async move {
            let writes = faster.iter().map(|slot| {
                let key = &key;
                let payload = &payload;
                let stats = &stats;
                async move {
                    let entry = CacheEntry::with_ttl(payload.clone(), slot.ttl);
                    match slot.store.set(key, entry).await {
                        Ok(()) => stats.record_tier_set(slot.name),
                        Err(error) => {
                            warn!(cache = cache_name, tier = slot.name, %error, "back-fill write failed");
                        }
                    }
                }
            });
            futures::future::join_all(writes).await;
        });
    }

    /// Writes a freshly computed value to every available tier.
    ///
    /// Writes run concurrently and independently; one tier failing to accept
    /// the value neither blocks the others nor affects the response.
    async fn write_through(&self, key: &CacheKey, value: &V) {
        let writes = self.tiers.iter().filter(|slot| slot.store.is_available()).map(|slot| {
            async move {
                let entry = CacheEntry::with_ttl(value.clone(), slot.ttl);
                match slot.store.set(key, entry).await {
                    Ok(()) => self.stats.record_tier_set(slot.name),
                    Err(error) => {
                        warn!(cache = self.name, tier = slot.name, %error, "write-through failed");
                    }
                }
            }
        });
        futures::future::join_all(writes).await;
    }
}
