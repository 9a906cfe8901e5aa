// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Redis-backed distributed tier for the credence caching system.
//!
//! [`RedisTier`] is the shared middle tier of a lookup chain: entries are
//! stored as JSON wire records with Redis-native TTL enforcement, so every
//! process instance pointed at the same server sees the same warm cache.
//!
//! The client connection is established lazily on the first real operation,
//! under a bounded connect timeout. If the server cannot be reached, the tier
//! marks itself unavailable and every operation degrades to an immediate
//! no-op; the cache chain simply skips it. After a successful first
//! connection, reconnection is the connection manager's responsibility.

mod config;
mod tier;

pub use config::RedisTierConfig;
pub use tier::RedisTier;
