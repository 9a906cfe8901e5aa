// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration for the Redis tier.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`RedisTier`](crate::RedisTier).
///
/// Timeouts and backoffs are stored as integer milliseconds so the struct can
/// be embedded directly in an application's configuration file; the accessor
/// methods expose them as [`Duration`]s.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisTierConfig {
    /// Server URL, e.g. `redis://127.0.0.1:6379`.
    pub url: String,
    /// Prefix applied to every physical key stored by this tier.
    pub key_prefix: String,
    /// Bound on establishing the initial connection.
    pub connect_timeout_ms: u64,
    /// Bound on each individual command.
    pub command_timeout_ms: u64,
    /// How many times a failed command is attempted in total.
    pub retry_attempts: u32,
    /// Backoff before the first retry; doubles per attempt.
    pub retry_backoff_ms: u64,
    /// Ceiling on the doubling backoff.
    pub retry_backoff_cap_ms: u64,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "credence:".to_string(),
            connect_timeout_ms: 10_000,
            command_timeout_ms: 2_000,
            retry_attempts: 3,
            retry_backoff_ms: 200,
            retry_backoff_cap_ms: 2_000,
        }
    }
}

impl RedisTierConfig {
    /// Creates a configuration for the given server URL, with defaults for
    /// everything else.
    #[must_use]
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Bound on establishing the initial connection.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Bound on each individual command.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Backoff before the first retry.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Ceiling on the doubling backoff.
    #[must_use]
    pub fn retry_backoff_cap(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_cap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_bounds() {
        let config = RedisTierConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_backoff_cap(), Duration::from_secs(2));
        assert!(config.key_prefix.ends_with(':'));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RedisTierConfig::for_url("redis://cache.internal:6380");
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: RedisTierConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.url, config.url);
        assert_eq!(parsed.command_timeout(), config.command_timeout());
    }
}
