//! Centralized configuration for camdeck.
//!
//! Tunables for the session state machine, the periodic monitors and the
//! alert log live here instead of being scattered as literals.

use std::time::Duration;

/// Ceiling on in-place retries after fatal stream errors.
///
/// Configuration may lower it but never raise it.
pub const MAX_FATAL_RETRIES: u32 = 2;

/// Central configuration for all camdeck components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct CamdeckConfig {
    pub session: SessionConfig,
    pub monitor: MonitorConfig,
    pub alerts: AlertConfig,
}

/// Stream session behaviour.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fatal client errors retried in place before the session fails,
    /// capped at [`MAX_FATAL_RETRIES`]
    pub max_fatal_retries: u32,
    /// Whether a freshly created session intends to play once connected
    pub autoplay: bool,
    /// Capacity of the command channel between handles and the actor
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_fatal_retries: MAX_FATAL_RETRIES,
            autoplay: true,
            command_buffer: 32,
        }
    }
}

/// Periodic side effects that run next to the session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between simulated motion checks
    pub motion_interval: Duration,
    /// Fixed seed for the motion simulator (None = seeded from entropy)
    pub motion_seed: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            motion_interval: Duration::from_secs(10),
            motion_seed: None,
        }
    }
}

/// Alert retention on the consumer side.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Alerts kept in the log before the oldest is dropped
    pub capacity: usize,
    /// Buffered alerts per broadcast subscriber before it starts lagging
    pub broadcast_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            broadcast_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Retry ceiling actually applied by the session.
    pub fn retry_ceiling(&self) -> u32 {
        self.max_fatal_retries.min(MAX_FATAL_RETRIES)
    }
}

impl CamdeckConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(retries) = env_parse::<u32>("CAMDECK_MAX_RETRIES") {
            config.session.max_fatal_retries = retries.min(MAX_FATAL_RETRIES);
        }

        if let Some(autoplay) = env_parse::<bool>("CAMDECK_AUTOPLAY") {
            config.session.autoplay = autoplay;
        }

        if let Some(capacity) = env_parse::<usize>("CAMDECK_ALERT_CAPACITY") {
            config.alerts.capacity = capacity.max(1);
        }

        if let Some(seconds) = env_parse::<u64>("CAMDECK_MOTION_INTERVAL_SECS") {
            config.monitor.motion_interval = Duration::from_secs(seconds.max(1));
        }

        if let Some(seed) = env_parse::<u64>("CAMDECK_MOTION_SEED") {
            config.monitor.motion_seed = Some(seed);
        }

        config
    }

    /// Creates a configuration for deterministic tests.
    pub fn deterministic_testing() -> Self {
        Self {
            monitor: MonitorConfig {
                motion_interval: Duration::from_secs(10),
                motion_seed: Some(42),
            },
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CamdeckConfig::default();

        assert_eq!(config.session.max_fatal_retries, 2);
        assert!(config.session.autoplay);
        assert_eq!(config.alerts.capacity, 50);
        assert_eq!(config.monitor.motion_interval, Duration::from_secs(10));
        assert!(config.monitor.motion_seed.is_none());
    }

    #[test]
    fn test_retry_ceiling_cannot_be_raised() {
        let raised = SessionConfig {
            max_fatal_retries: 10,
            ..SessionConfig::default()
        };
        assert_eq!(raised.retry_ceiling(), MAX_FATAL_RETRIES);

        let lowered = SessionConfig {
            max_fatal_retries: 0,
            ..SessionConfig::default()
        };
        assert_eq!(lowered.retry_ceiling(), 0);
    }

    #[test]
    fn test_deterministic_config_has_seed() {
        let config = CamdeckConfig::deterministic_testing();
        assert_eq!(config.monitor.motion_seed, Some(42));
    }
}
