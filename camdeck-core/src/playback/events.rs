//! Epoch-stamped playback callbacks.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Generation counter of a session's attachments.
///
/// A session advances its epoch on every teardown. Events carry the epoch
/// they were registered under, so anything from an earlier generation can
/// be recognised and dropped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Epoch(u64);

impl Epoch {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {}", self.0)
    }
}

/// Error payload reported by a streaming client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Client cannot continue without restarting the load
    pub fatal: bool,
    /// Library-provided detail code, e.g. `manifestLoadError`
    pub details: String,
}

impl ErrorDetail {
    pub fn fatal(details: impl Into<String>) -> Self {
        Self {
            fatal: true,
            details: details.into(),
        }
    }

    pub fn recoverable(details: impl Into<String>) -> Self {
        Self {
            fatal: false,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEventKind {
    /// Streaming client parsed the manifest and can play.
    ManifestParsed,
    /// Streaming client reported an error.
    ClientError(ErrorDetail),
    /// Natively played source finished loading metadata.
    MetadataLoaded,
    /// Natively played source failed to load.
    SinkError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub epoch: Epoch,
    pub kind: PlaybackEventKind,
}

/// Callback registration handed to clients and sinks.
///
/// Sending is fire-and-forget: if the session is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    epoch: Epoch,
    sender: mpsc::UnboundedSender<PlaybackEvent>,
}

impl EventSender {
    pub fn new(epoch: Epoch, sender: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self { epoch, sender }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn manifest_parsed(&self) {
        self.emit(PlaybackEventKind::ManifestParsed);
    }

    pub fn error(&self, detail: ErrorDetail) {
        self.emit(PlaybackEventKind::ClientError(detail));
    }

    pub fn metadata_loaded(&self) {
        self.emit(PlaybackEventKind::MetadataLoaded);
    }

    pub fn sink_error(&self, reason: impl Into<String>) {
        self.emit(PlaybackEventKind::SinkError(reason.into()));
    }

    fn emit(&self, kind: PlaybackEventKind) {
        tracing::trace!("Playback event {:?} for {}", kind, self.epoch);
        let event = PlaybackEvent {
            epoch: self.epoch,
            kind,
        };
        if self.sender.send(event).is_err() {
            tracing::trace!("Playback event dropped, session receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_stamps_epoch() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let events = EventSender::new(Epoch::new(7), sender);

        events.manifest_parsed();
        events.error(ErrorDetail::fatal("networkError"));

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.epoch, Epoch::new(7));
        assert_eq!(first.kind, PlaybackEventKind::ManifestParsed);

        let second = receiver.try_recv().unwrap();
        assert_eq!(
            second.kind,
            PlaybackEventKind::ClientError(ErrorDetail::fatal("networkError"))
        );
    }

    #[test]
    fn test_epoch_ordering() {
        let epoch = Epoch::default();
        assert!(epoch.next() > epoch);
        assert_eq!(epoch.next().value(), 1);
    }
}
