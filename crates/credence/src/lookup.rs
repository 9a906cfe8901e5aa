// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Response tagging for cache lookups.

/// Where a returned value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupSource {
    /// Served from the named cache tier.
    Tier(&'static str),
    /// Freshly computed because every tier missed.
    Computed,
}

impl LookupSource {
    /// Returns `true` if the value was served from a cache tier.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Tier(_))
    }

    /// Returns the name of the tier that served the value, if any.
    #[must_use]
    pub fn tier_name(&self) -> Option<&'static str> {
        match self {
            Self::Tier(name) => Some(name),
            Self::Computed => None,
        }
    }
}

/// A value returned by the cache, tagged with where it came from.
///
/// The tag lets callers surface cache behavior in telemetry or response
/// headers without the cache owning that surface.
#[derive(Clone, Debug)]
pub struct Lookup<V> {
    /// The payload itself.
    pub value: V,
    /// Where the payload came from.
    pub source: LookupSource,
}

impl<V> Lookup<V> {
    /// Returns `true` if the value was served from a cache tier.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.source.is_cached()
    }

    /// Consumes the lookup and returns the payload.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }
}
