// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring a memory tier.

use std::sync::Arc;

use crate::MemoryTier;

/// Estimates the resident size of a payload, in bytes.
pub(crate) type Weigher<V> = Arc<dyn Fn(&V) -> usize + Send + Sync>;

/// Builder for configuring a [`MemoryTier`].
///
/// # Examples
///
/// ```
/// use credence_memory::MemoryTier;
///
/// let tier = MemoryTier::<String>::builder()
///     .max_capacity(10_000)
///     .weigher(|payload: &String| payload.len())
///     .build();
/// ```
pub struct MemoryTierBuilder<V> {
    pub(crate) name: &'static str,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) weigher: Option<Weigher<V>>,
}

impl<V> std::fmt::Debug for MemoryTierBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTierBuilder")
            .field("name", &self.name)
            .field("max_capacity", &self.max_capacity)
            .field("weigher", &self.weigher.is_some())
            .finish()
    }
}

impl<V> Default for MemoryTierBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryTierBuilder<V> {
    /// Creates a builder with the default configuration (unbounded, unweighed).
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "memory",
            max_capacity: None,
            weigher: None,
        }
    }

    /// Overrides the tier name used in statistics and log lines.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Bounds the number of entries the tier may hold.
    ///
    /// When the bound is reached, expired entries are evicted first, then the
    /// least recently accessed entry. Expiry semantics are unaffected.
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    /// Installs a payload size estimator.
    ///
    /// With a weigher installed, the tier reports its approximate resident
    /// size through `TierStore::weight`, which feeds the cache's
    /// memory-usage statistic.
    #[must_use]
    pub fn weigher<F>(mut self, weigher: F) -> Self
    where
        F: Fn(&V) -> usize + Send + Sync + 'static,
    {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    /// Builds the tier.
    #[must_use]
    pub fn build(self) -> MemoryTier<V> {
        MemoryTier::from_builder(self)
    }
}
