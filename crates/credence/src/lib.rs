// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A multi-tier content-analysis cache with stampede control.
//!
//! `credence` fronts an expensive computation — originally, AI trust analysis
//! of article text — with a chain of storage tiers of increasing durability
//! and latency: in-process memory, a shared distributed cache, and a durable
//! store. The crate provides:
//!
//! - [`Cache`]: the get-or-compute engine. Probes tiers in priority order,
//!   back-fills faster tiers on a slower hit, and degrades tier-by-tier —
//!   a broken backend costs latency, never correctness.
//! - [`SingleFlight`]: per-key coalescing so concurrent misses for the same
//!   key trigger exactly one computation.
//! - [`TtlPolicy`]: per-tier time-to-live configuration per logical cache.
//! - [`CacheStats`]: process-local hit/miss/size accounting.
//!
//! Storage backends live in their own crates (`credence_memory`,
//! `credence_redis`, `credence_sqlite`) and are re-exported here behind
//! feature flags; anything implementing
//! [`TierStore`](credence_tier::TierStore) can join the chain.
//!
//! # Examples
//!
//! ```
//! use credence::{Cache, MemoryTier, TtlPolicy};
//! use std::time::Duration;
//! # futures::executor::block_on(async {
//!
//! let cache: Cache<String> = Cache::builder("analysis")
//!     .tier(MemoryTier::new())
//!     .ttl_policy(TtlPolicy::uniform(Duration::from_secs(24 * 60 * 60)))
//!     .build();
//!
//! let analysis = cache
//!     .get_or_compute("https://news.example/article", || async {
//!         // The expensive call lives here; it runs only on a full miss.
//!         Ok::<_, std::io::Error>("mostly reliable".to_string())
//!     })
//!     .await?;
//! assert_eq!(analysis.value, "mostly reliable");
//! # Ok::<(), credence::ComputeError>(())
//! # });
//! ```

pub mod builder;
pub mod cache;
mod error;
mod flight;
mod lookup;
mod stats;

#[doc(inline)]
pub use builder::{CacheBuilder, DEFAULT_TTL, TtlPolicy};
#[doc(inline)]
pub use cache::Cache;
#[cfg(feature = "memory")]
#[doc(inline)]
pub use credence_memory::MemoryTier;
#[cfg(feature = "redis")]
#[doc(inline)]
pub use credence_redis::{RedisTier, RedisTierConfig};
#[cfg(feature = "sqlite")]
#[doc(inline)]
pub use credence_sqlite::SqliteTier;
#[doc(inline)]
pub use credence_tier::{BoxFuture, CacheEntry, CacheKey, CacheRecord, Error, KeyDeriver, NoopTier, Result, TierStore};
#[doc(inline)]
pub use error::ComputeError;
#[doc(inline)]
pub use flight::SingleFlight;
#[doc(inline)]
pub use lookup::{Lookup, LookupSource};
#[doc(inline)]
pub use stats::{CacheStats, TierStats};

#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use credence_tier::testing::{MockTier, TierOp};
