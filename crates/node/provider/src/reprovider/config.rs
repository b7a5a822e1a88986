//! Reprovider configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default deadline for a single announcement.
pub const DEFAULT_PROVIDE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default period between sweeps.
pub const DEFAULT_REPROVIDE_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default freshness granted by a successful announcement.
pub const DEFAULT_PROVIDE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Default number of announce workers.
pub const DEFAULT_WORKER_COUNT: usize = 16;

/// Default number of announce attempts per identifier and sweep.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Errors raised while loading or validating a [`ReproviderConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("Invalid reprovider config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A duration that must be positive is zero.
    #[error("`{0}` must be greater than zero")]
    ZeroDuration(&'static str),

    /// A count that must be positive is zero.
    #[error("`{0}` must be at least 1")]
    ZeroCount(&'static str),

    /// Announcements would lapse before the next sweep renews them.
    #[error("`provide_ttl` ({ttl:?}) is shorter than `reprovide_interval` ({interval:?})")]
    TtlShorterThanInterval {
        /// The configured freshness window.
        ttl: Duration,
        /// The configured sweep period.
        interval: Duration,
    },

    /// The retry delay bounds are inverted.
    #[error("`retry_min_delay` ({min:?}) exceeds `retry_max_delay` ({max:?})")]
    InvertedRetryDelays {
        /// The configured lower bound.
        min: Duration,
        /// The configured upper bound.
        max: Duration,
    },

    /// A component required to build the reprovider was not supplied.
    #[error("Missing required component: {0}")]
    Missing(&'static str),
}

/// Configuration of a [`Reprovider`](crate::Reprovider).
///
/// Durations are written as whole seconds in TOML. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReproviderConfig {
    /// Deadline for a single announcement attempt.
    #[serde(with = "secs")]
    pub provide_timeout: Duration,
    /// Period between sweeps.
    #[serde(with = "secs")]
    pub reprovide_interval: Duration,
    /// Freshness granted by a successful announcement. Must be at least `reprovide_interval`.
    #[serde(with = "secs")]
    pub provide_ttl: Duration,
    /// Number of announce workers.
    pub worker_count: usize,
    /// Announce attempts per identifier and sweep.
    pub max_attempts: usize,
    /// Lower bound of the jittered exponential backoff between attempts.
    #[serde(with = "secs")]
    pub retry_min_delay: Duration,
    /// Upper bound of the backoff between attempts.
    #[serde(with = "secs")]
    pub retry_max_delay: Duration,
    /// Capacity of the queue between the sweep and the workers.
    pub queue_capacity: usize,
    /// Whether announcements push provider records to the closest peers right away.
    pub broadcast: bool,
}

impl Default for ReproviderConfig {
    fn default() -> Self {
        Self {
            provide_timeout: DEFAULT_PROVIDE_TIMEOUT,
            reprovide_interval: DEFAULT_REPROVIDE_INTERVAL,
            provide_ttl: DEFAULT_PROVIDE_TTL,
            worker_count: DEFAULT_WORKER_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_min_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            queue_capacity: 1024,
            broadcast: true,
        }
    }
}

impl ReproviderConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants between fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provide_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("provide_timeout"));
        }
        if self.reprovide_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("reprovide_interval"));
        }
        if self.provide_ttl < self.reprovide_interval {
            return Err(ConfigError::TtlShorterThanInterval {
                ttl: self.provide_ttl,
                interval: self.reprovide_interval,
            });
        }
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroCount("worker_count"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroCount("max_attempts"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCount("queue_capacity"));
        }
        if self.retry_min_delay > self.retry_max_delay {
            return Err(ConfigError::InvertedRetryDelays {
                min: self.retry_min_delay,
                max: self.retry_max_delay,
            });
        }
        Ok(())
    }
}

/// (De)serializes a [`Duration`] as whole seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReproviderConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.provide_timeout, Duration::from_secs(60));
        assert_eq!(config.reprovide_interval, Duration::from_secs(7200));
        assert_eq!(config.provide_ttl, Duration::from_secs(21600));
        assert_eq!(config.worker_count, 16);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = ReproviderConfig::from_toml_str(
            r#"
            worker_count = 4
            provide_timeout = 15
            broadcast = false
            "#,
        )
        .unwrap();

        assert_eq!(config.worker_count, 4);
        assert_eq!(config.provide_timeout, Duration::from_secs(15));
        assert!(!config.broadcast);
        assert_eq!(config.provide_ttl, DEFAULT_PROVIDE_TTL);
    }

    #[test]
    fn test_ttl_must_cover_the_interval() {
        let err = ReproviderConfig::from_toml_str("reprovide_interval = 600\nprovide_ttl = 300")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TtlShorterThanInterval { .. }));
    }

    #[test]
    fn test_rejects_zero_workers_and_unknown_fields() {
        assert!(matches!(
            ReproviderConfig::from_toml_str("worker_count = 0"),
            Err(ConfigError::ZeroCount("worker_count"))
        ));
        assert!(matches!(
            ReproviderConfig::from_toml_str("workers = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_retry_delays() {
        let config = ReproviderConfig {
            retry_min_delay: Duration::from_secs(10),
            retry_max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvertedRetryDelays { .. })));
    }
}
