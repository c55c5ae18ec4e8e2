//! Collaborator contracts for the streaming library and the video element.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::EventSender;

/// MIME type probed when deciding whether a sink can play HLS by itself.
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Identity of a video sink. No two sessions may hold the same sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SinkId(pub u64);

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

/// A playable media element.
///
/// Sinks that play a source natively report `loaded metadata` and `error`
/// through the sender passed to [`VideoSink::set_source`].
pub trait VideoSink: Send {
    fn id(&self) -> SinkId;

    /// Requests playback. Rejections (autoplay policy, no source) are
    /// reported as errors and are expected.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::PlayRejected` - The sink refused to start playing
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    /// Sets a source for native playback and registers its callbacks.
    fn set_source(&mut self, url: &str, events: EventSender);

    /// Drops the current source.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::SinkFailed` - The element refused the change
    fn remove_source(&mut self) -> Result<(), PlaybackError>;

    /// Reloads the element after a source change.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::SinkFailed` - The element refused to reload
    fn load(&mut self) -> Result<(), PlaybackError>;

    fn can_play_natively(&self, mime_type: &str) -> bool;
}

/// One instance of the adaptive streaming library.
///
/// Reports `manifest parsed` and `error` through the [`EventSender`] it was
/// created with.
pub trait StreamingClient: Send {
    fn attach_media(&mut self, sink: &mut dyn VideoSink);

    fn load_source(&mut self, url: &str);

    /// Resumes loading after a fatal error, reusing the same instance.
    fn start_load(&mut self);

    /// Releases the instance.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::TeardownFailed` - The library threw while tearing down
    fn destroy(&mut self) -> Result<(), PlaybackError>;
}

/// Factory for streaming clients in the current environment.
pub trait StreamingBackend: Send {
    /// Whether adaptive streaming works here at all.
    fn is_supported(&self) -> bool;

    fn create_client(&self, events: EventSender) -> Box<dyn StreamingClient>;
}

/// Failures reported by sinks and clients.
///
/// None of these escalate to a failed session; they are logged and, for
/// playback requests, remembered as the session's last error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback request rejected: {reason}")]
    PlayRejected { reason: String },

    #[error("video sink operation failed: {reason}")]
    SinkFailed { reason: String },

    #[error("streaming client teardown failed: {reason}")]
    TeardownFailed { reason: String },
}
