// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Durable SQLite-backed tier for the credence caching system.
//!
//! [`SqliteTier`] is the persistent end of a lookup chain: one row per cache
//! key, with the payload stored as JSON next to its timestamps and hit count.
//! Reads filter out logically-expired rows even when they have not been
//! physically deleted yet; [`SqliteTier::purge_expired`] is the eager
//! companion sweep.
//!
//! All statements run on the blocking pool, so the tier is safe to use from
//! async contexts.

mod tier;

pub use tier::SqliteTier;
