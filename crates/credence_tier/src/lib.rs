// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait and vocabulary types for credence cache storage tiers.
//!
//! This crate defines the pieces every storage backend shares:
//!
//! - [`TierStore`]: the capability trait a backend implements (get/set/delete/clear
//!   plus an availability check),
//! - [`CacheEntry`]: a cached payload with its timestamps and hit count,
//! - [`CacheRecord`]: the serialized wire shape used by out-of-process tiers,
//! - [`CacheKey`] and [`KeyDeriver`]: canonical key derivation from natural
//!   identifiers such as URLs,
//! - [`Error`]: the tier-side failure taxonomy,
//! - [`NoopTier`]: the canonical stand-in for an absent or disabled backend.
//!
//! Backends implement the storage operations; the `credence` crate layers the
//! multi-tier lookup chain, stampede control, and statistics on top.

pub mod entry;
pub mod error;
pub mod key;
pub mod noop;
pub mod record;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod tier;

#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result};
/// Boxed future type used by [`TierStore`] methods.
pub use futures::future::BoxFuture;
#[doc(inline)]
pub use key::{CacheKey, KeyDeriver};
#[doc(inline)]
pub use noop::NoopTier;
#[doc(inline)]
pub use record::CacheRecord;
#[doc(inline)]
pub use tier::TierStore;
