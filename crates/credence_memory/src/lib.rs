// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process memory tier for the credence caching system.
//!
//! [`MemoryTier`] is the fastest tier in a lookup chain: a process-local map
//! with expiry checked lazily at read time and hit counts updated in place.
//! It is unbounded by default; a maximum capacity with least-recently-used
//! eviction can be configured as a hardening measure, and an optional weigher
//! lets the tier report its approximate resident size.
//!
//! # Examples
//!
//! ```
//! use credence_memory::MemoryTier;
//! use credence_tier::{CacheEntry, CacheKey, TierStore};
//! # futures::executor::block_on(async {
//!
//! let tier = MemoryTier::<String>::new();
//! let key = CacheKey::from("analysis:abc");
//!
//! tier.set(&key, CacheEntry::new("payload".to_string())).await?;
//! let entry = tier.get(&key).await?.expect("entry should exist");
//! assert_eq!(entry.value(), "payload");
//! # Ok::<(), credence_tier::Error>(())
//! # });
//! ```

mod builder;
mod tier;

pub use builder::MemoryTierBuilder;
pub use tier::MemoryTier;
