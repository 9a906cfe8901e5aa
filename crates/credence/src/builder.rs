// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder types for constructing a cache and its TTL policy.

use std::{collections::HashMap, sync::Arc, time::Duration};

use credence_tier::TierStore;

use crate::{Cache, cache::TierSlot};

/// Default time-to-live applied when a tier has no specific policy entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-tier time-to-live policy for one logical cache.
///
/// Each logical cache supplies its own policy — analysis results might live a
/// day while generated quiz content lives an hour — and each tier can be
/// given its own TTL within it (a fast tier typically expires sooner than the
/// durable one).
///
/// # Examples
///
/// ```
/// use credence::TtlPolicy;
/// use std::time::Duration;
///
/// let policy = TtlPolicy::uniform(Duration::from_secs(24 * 60 * 60))
///     .with_tier("memory", Duration::from_secs(60 * 60));
/// assert_eq!(policy.ttl_for("memory"), Duration::from_secs(60 * 60));
/// assert_eq!(policy.ttl_for("sqlite"), Duration::from_secs(24 * 60 * 60));
/// ```
#[derive(Clone, Debug)]
pub struct TtlPolicy {
    default_ttl: Duration,
    per_tier: HashMap<&'static str, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::uniform(DEFAULT_TTL)
    }
}

impl TtlPolicy {
    /// Creates a policy that applies `ttl` to every tier.
    #[must_use]
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            default_ttl: ttl,
            per_tier: HashMap::new(),
        }
    }

    /// Overrides the TTL for the named tier.
    #[must_use]
    pub fn with_tier(mut self, name: &'static str, ttl: Duration) -> Self {
        self.per_tier.insert(name, ttl);
        self
    }

    /// Returns the TTL that applies to the named tier.
    #[must_use]
    pub fn ttl_for(&self, name: &str) -> Duration {
        self.per_tier.get(name).copied().unwrap_or(self.default_ttl)
    }

    /// Returns the TTL applied to tiers without a specific entry.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Builder for constructing a [`Cache`].
///
/// Tiers are registered in probe order: the first tier added is checked
/// first, and back-fill flows toward it. Tier instances are constructed by
/// the caller and injected here, which keeps the chain testable with
/// in-memory doubles.
///
/// # Examples
///
/// ```
/// use credence::{Cache, MemoryTier, TtlPolicy};
/// use std::time::Duration;
///
/// let cache: Cache<String> = Cache::builder("analysis")
///     .tier(MemoryTier::new())
///     .ttl_policy(TtlPolicy::uniform(Duration::from_secs(3600)))
///     .build();
/// ```
pub struct CacheBuilder<V> {
    name: &'static str,
    tiers: Vec<(Arc<dyn TierStore<V>>, Option<Duration>)>,
    ttl_policy: TtlPolicy,
}

impl<V> std::fmt::Debug for CacheBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("name", &self.name)
            .field("tiers", &self.tiers.len())
            .field("ttl_policy", &self.ttl_policy)
            .finish()
    }
}

impl<V> CacheBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            tiers: Vec::new(),
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Appends a tier to the probe order, using the policy TTL for its name.
    #[must_use]
    pub fn tier(mut self, store: impl TierStore<V> + 'static) -> Self {
        self.tiers.push((Arc::new(store), None));
        self
    }

    /// Appends a tier with an explicit TTL, overriding the policy.
    #[must_use]
    pub fn tier_with_ttl(mut self, store: impl TierStore<V> + 'static, ttl: Duration) -> Self {
        self.tiers.push((Arc::new(store), Some(ttl)));
        self
    }

    /// Appends an already-shared tier to the probe order.
    ///
    /// Useful when the same tier instance also needs to be reachable outside
    /// the cache, e.g. for maintenance sweeps.
    #[must_use]
    pub fn shared_tier(mut self, store: Arc<dyn TierStore<V>>) -> Self {
        self.tiers.push((store, None));
        self
    }

    /// Sets the TTL policy for this logical cache.
    #[must_use]
    pub fn ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache<V> {
        let Self { name, tiers, ttl_policy } = self;
        let slots: Vec<TierSlot<V>> = tiers
            .into_iter()
            .map(|(store, ttl)| {
                let tier_name = store.name();
                TierSlot {
                    ttl: ttl.unwrap_or_else(|| ttl_policy.ttl_for(tier_name)),
                    name: tier_name,
                    store,
                }
            })
            .collect();
        Cache::new(name, slots)
    }
}
