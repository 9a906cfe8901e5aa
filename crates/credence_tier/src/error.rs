// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for tier operations.

use std::time::Duration;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// An error from a tier operation.
///
/// Tiers report failures honestly through this type; the orchestrator in the
/// `credence` crate is the single place that decides to treat them as soft
/// failures (a skipped tier or a miss). Only the computation supplied by the
/// caller can produce an error that crosses the orchestrator boundary.
///
/// # Example
///
/// ```
/// use credence_tier::Error;
///
/// let error = Error::backend("connection reset");
/// assert!(error.to_string().contains("connection reset"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend is unreachable or not ready.
    #[error("tier is not available")]
    Unavailable,

    /// The operation did not complete within the tier's bounded timeout.
    #[error("tier operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend accepted the operation but failed while executing it.
    #[error("backend operation failed: {0}")]
    Backend(#[source] Cause),

    /// Stored data failed to deserialize into the expected record shape.
    ///
    /// Tiers treat this the same as an absent entry after logging it, which
    /// protects the lookup chain against schema drift between deployments.
    #[error("malformed cache record: {0}")]
    Malformed(#[source] Cause),
}

impl Error {
    /// Creates a backend error from any underlying cause.
    pub fn backend(cause: impl Into<Cause>) -> Self {
        Self::Backend(cause.into())
    }

    /// Creates a malformed-record error from any underlying cause.
    pub fn malformed(cause: impl Into<Cause>) -> Self {
        Self::Malformed(cause.into())
    }
}

/// A specialized [`Result`] type for tier operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display_contains_cause_message() {
        let error = Error::backend("socket closed");
        assert!(
            error.to_string().contains("socket closed"),
            "display output should contain the cause message, got: {error}"
        );
    }

    #[test]
    fn malformed_error_preserves_source() {
        let cause = serde_json::from_str::<u32>("not json").expect_err("must fail");
        let error = Error::malformed(cause);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::Unavailable)
        }

        let err = returns_err().expect_err("should return an error");
        assert!(matches!(err, Error::Unavailable));
    }
}
