// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The error surfaced when a cached computation fails.

use std::{error::Error as StdError, fmt, sync::Arc};

/// A failed computation, as surfaced by
/// [`Cache::get_or_compute`](crate::Cache::get_or_compute).
///
/// This is the only error that crosses the cache boundary: tier failures are
/// recovered internally, so every `ComputeError` traces back to the compute
/// function the caller supplied. Because a failing computation is shared with
/// every concurrent caller coalesced into the same flight, the original error
/// is held behind an [`Arc`]; it is reachable through [`inner`](Self::inner),
/// [`downcast_ref`](Self::downcast_ref), or [`source`](StdError::source).
///
/// Failures are not cached: a later call for the same key runs the
/// computation again.
#[derive(Clone)]
pub struct ComputeError {
    source: Arc<dyn StdError + Send + Sync>,
}

impl ComputeError {
    /// Wraps a computation failure.
    pub fn new(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Returns the original computation error.
    #[must_use]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Returns the original error as a concrete type, if it is one.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.source.downcast_ref::<E>()
    }
}

impl fmt::Debug for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComputeError").field(&self.source).finish()
    }
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl StdError for ComputeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref() as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct AnalyzerDown(&'static str);

    impl fmt::Display for AnalyzerDown {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "analyzer down: {}", self.0)
        }
    }

    impl StdError for AnalyzerDown {}

    #[test]
    fn display_shows_the_original_message() {
        let error = ComputeError::new(AnalyzerDown("upstream 503"));
        assert_eq!(error.to_string(), "analyzer down: upstream 503");
    }

    #[test]
    fn downcast_recovers_the_original_error() {
        let error = ComputeError::new(AnalyzerDown("upstream 503"));
        assert_eq!(error.downcast_ref::<AnalyzerDown>(), Some(&AnalyzerDown("upstream 503")));
        assert!(error.downcast_ref::<std::io::Error>().is_none());
    }

    #[test]
    fn clones_share_the_same_source() {
        let error = ComputeError::new(AnalyzerDown("upstream 503"));
        let shared = error.clone();
        assert_eq!(error.to_string(), shared.to_string());
    }
}
