//! Camdeck Core - playback lifecycle for camera dashboard widgets
//!
//! This crate owns the contract-bearing part of a camera dashboard: one
//! stream session per camera slot, attached to exactly one adaptive
//! streaming client at a time, with bounded retry on fatal errors and an
//! alert channel for the rendering layer. Rendering, layout and the real
//! streaming library stay outside and plug in through the traits in
//! [`playback`].

pub mod alerts;
pub mod config;
pub mod engine;
pub mod feed;
pub mod monitor;
pub mod playback;
pub mod session;
pub mod settings;
pub mod tracing_setup;
pub mod wall;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

// Re-export main types for convenient access
pub use alerts::{Alert, AlertId, AlertIds, AlertLevel, AlertLog};
pub use config::CamdeckConfig;
pub use engine::{SessionError, SessionHandle, spawn_session};
pub use session::{
    ConnectionState, HistoricalWindow, PlaybackMode, SessionSnapshot, StreamSession, WindowError,
};
pub use settings::{CameraId, CameraSettings, SettingsError};
pub use wall::{CameraWall, WallError};

/// Errors that can bubble up from any camdeck subsystem.
///
/// The stream session itself never fails loudly; these cover the layers
/// around it: settings files, recording windows, the actor channel and
/// the camera wall.
#[derive(Debug, thiserror::Error)]
pub enum CamdeckError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Recording window error: {0}")]
    Window(#[from] WindowError),

    #[error("Camera wall error: {0}")]
    Wall(#[from] WallError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CamdeckError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            CamdeckError::Session(_) => "Camera session is no longer running".to_string(),
            CamdeckError::Settings(SettingsError::Parse(_)) => {
                "Camera settings file is not valid JSON".to_string()
            }
            CamdeckError::Settings(e) => format!("Camera settings problem: {e}"),
            CamdeckError::Window(e) => format!("Invalid recording window: {e}"),
            CamdeckError::Wall(WallError::SinkInUse { sink, camera }) => {
                format!("Video output {sink} is already used by camera {camera}")
            }
            CamdeckError::Wall(_) => "Camera wall operation failed".to_string(),
            CamdeckError::Configuration { .. } => "Invalid configuration".to_string(),
            CamdeckError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CamdeckError::Window(_)
                | CamdeckError::Configuration { .. }
                | CamdeckError::Settings(SettingsError::Parse(_) | SettingsError::Invalid { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_errors_are_user_errors() {
        let error = CamdeckError::from(WindowError::InvertedRange { start: 18, end: 9 });
        assert!(error.is_user_error());
        assert!(error.user_message().contains("18"));
    }

    #[test]
    fn test_configuration_errors_are_user_errors() {
        let error = CamdeckError::Configuration {
            reason: "look-back out of range".to_string(),
        };
        assert!(error.is_user_error());
        assert_eq!(error.user_message(), "Invalid configuration");
        assert!(error.to_string().contains("look-back out of range"));
    }

    #[test]
    fn test_session_errors_are_not_user_errors() {
        let error = CamdeckError::from(SessionError::ActorShutdown);
        assert!(!error.is_user_error());
        assert_eq!(error.user_message(), "Camera session is no longer running");
    }
}
