// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hit/miss accounting for the cache and its tiers.
//!
//! Counters are monotonic for the process lifetime and process-local: under a
//! multi-instance deployment each instance reports its own hit rate, while
//! stored wire records carry their own per-entry hit counts across instances.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

/// Process-local counters for a cache and each of its tiers.
pub(crate) struct StatsCollector {
    overall: Counters,
    tiers: Vec<(&'static str, Counters)>,
}

impl StatsCollector {
    pub(crate) fn new(tier_names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            overall: Counters::default(),
            tiers: tier_names.into_iter().map(|name| (name, Counters::default())).collect(),
        }
    }

    fn tier(&self, name: &str) -> Option<&Counters> {
        self.tiers
            .iter()
            .find(|(tier_name, _)| *tier_name == name)
            .map(|(_, counters)| counters)
    }

    pub(crate) fn record_cache_hit(&self) {
        self.overall.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.overall.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tier_hit(&self, name: &str) {
        if let Some(counters) = self.tier(name) {
            counters.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_tier_miss(&self, name: &str) {
        if let Some(counters) = self.tier(name) {
            counters.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_tier_set(&self, name: &str) {
        if let Some(counters) = self.tier(name) {
            counters.sets.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, total_keys: u64, weight: Option<u64>) -> CacheStats {
        let hits = self.overall.hits.load(Ordering::Relaxed);
        let misses = self.overall.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            total_keys,
            memory_usage: format_memory(weight),
            tiers: self
                .tiers
                .iter()
                .map(|(name, counters)| {
                    let hits = counters.hits.load(Ordering::Relaxed);
                    let misses = counters.misses.load(Ordering::Relaxed);
                    TierStats {
                        name,
                        hits,
                        misses,
                        sets: counters.sets.load(Ordering::Relaxed),
                        hit_rate: hit_rate(hits, misses),
                    }
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for StatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCollector").finish_non_exhaustive()
    }
}

/// A read-only snapshot of one cache's accounting.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Requests served from some tier.
    pub hits: u64,
    /// Requests that fell through to the computation.
    pub misses: u64,
    /// Percentage of requests served from cache, rounded to two decimals.
    /// `0.0` when nothing has been observed yet.
    pub hit_rate: f64,
    /// Total entries across tiers that report a size; best effort.
    pub total_keys: u64,
    /// Approximate resident size across tiers that report one, rendered as
    /// megabytes; `"0 MB"` when no tier reports.
    pub memory_usage: String,
    /// Per-tier accounting, in probe order.
    pub tiers: Vec<TierStats>,
}

/// A read-only snapshot of one tier's accounting.
#[derive(Clone, Debug, Serialize)]
pub struct TierStats {
    /// The tier's name.
    pub name: &'static str,
    /// Probes this tier answered.
    pub hits: u64,
    /// Probes this tier could not answer (including soft-failed ones).
    pub misses: u64,
    /// Entries written to this tier.
    pub sets: u64,
    /// Percentage of probes answered, rounded to two decimals.
    pub hit_rate: f64,
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        return 0.0;
    }
    let rate = (hits as f64 / total as f64) * 100.0;
    (rate * 100.0).round() / 100.0
}

pub(crate) fn format_memory(bytes: Option<u64>) -> String {
    match bytes {
        None | Some(0) => "0 MB".to_string(),
        Some(bytes) => format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0)),
    }
}
