//! Camdeck Simulation - deterministic playback stack for camera sessions
//!
//! A streaming backend and a video sink that behave like the real ones
//! without touching the network: manifests "arrive" after a configurable
//! latency, load attempts fail with a configurable probability and the sink
//! can refuse autoplay. Every random decision comes from a seeded ChaCha8
//! generator, so a seed fully determines a run.
//!
//! # Example
//!
//! ```rust,no_run
//! use camdeck_core::{AlertIds, CamdeckConfig, CameraSettings};
//! use camdeck_core::engine::spawn_session;
//! use camdeck_sim::{SimulatedBackend, SimulatedSink, SimulationConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sim = SimulationConfig {
//!     seed: 7,
//!     fatal_error_rate: 0.3,
//!     ..SimulationConfig::default()
//! };
//! sim.validate()?;
//!
//! let handle = spawn_session(
//!     1,
//!     CameraSettings::with_stream("Lobby", "https://cams.example.com/lobby.m3u8"),
//!     &CamdeckConfig::default(),
//!     Box::new(SimulatedBackend::new(sim.clone())),
//!     Box::new(SimulatedSink::new(1, sim)),
//!     AlertIds::new(),
//! );
//! handle.open_live().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod sink;

use std::time::Duration;

pub use backend::{SimulatedBackend, SimulatedClient};
pub use sink::SimulatedSink;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Error code reported for a failed manifest load.
pub const FATAL_ERROR_DETAILS: &str = "manifestLoadError";
/// Error code reported for a recoverable hiccup.
pub const RECOVERABLE_ERROR_DETAILS: &str = "bufferStalledError";

/// Behaviour of the simulated playback stack.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Seed for every random decision
    pub seed: u64,
    /// Delay before a manifest (or native metadata) is reported
    pub manifest_latency: Duration,
    /// Probability that a load attempt ends in a fatal error
    pub fatal_error_rate: f64,
    /// Probability that a successful attempt reports a recoverable error first
    pub recoverable_error_rate: f64,
    /// Whether the backend supports adaptive streaming at all
    pub supported: bool,
    /// Whether the sink plays HLS without a streaming client
    pub native_playback: bool,
    /// Whether the sink rejects the first play request
    pub autoplay_blocked: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            manifest_latency: Duration::from_millis(150),
            fatal_error_rate: 0.0,
            recoverable_error_rate: 0.0,
            supported: true,
            native_playback: false,
            autoplay_blocked: false,
        }
    }
}

/// Errors in simulation setup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("{name} must be within 0.0..=1.0, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
}

impl SimulationConfig {
    /// Checks that every probability is within `0.0..=1.0`.
    ///
    /// # Errors
    /// - `SimulationError::InvalidRate` - A rate is negative, above 1 or NaN
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, value) in [
            ("fatal_error_rate", self.fatal_error_rate),
            ("recoverable_error_rate", self.recoverable_error_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimulationError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// Runs `emit` after `delay` on the current runtime.
///
/// Outside a runtime the callback runs immediately and no task is returned.
fn schedule(delay: Duration, emit: impl FnOnce() + Send + 'static) -> Option<JoinHandle<()>> {
    match Handle::try_current() {
        Ok(runtime) => Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            emit();
        })),
        Err(_) => {
            emit();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        let config = SimulationConfig {
            fatal_error_rate: 1.5,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimulationError::InvalidRate {
                name: "fatal_error_rate",
                value: 1.5
            })
        );

        let config = SimulationConfig {
            recoverable_error_rate: f64::NAN,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
