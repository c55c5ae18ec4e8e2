//! Simulated video element.

use std::sync::Arc;

use camdeck_core::playback::{EventSender, HLS_MIME_TYPE, PlaybackError, SinkId, VideoSink};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;

use crate::{SimulationConfig, schedule};

#[derive(Debug)]
struct SinkState {
    playing: bool,
    source: Option<String>,
    pending: Option<JoinHandle<()>>,
    gesture_seen: bool,
    rng: ChaCha8Rng,
}

/// Video sink that tracks playback and, when configured for native
/// playback, reports metadata for sources set on it directly.
///
/// Clones share state, so a clone kept outside the session shows what the
/// session did to the sink.
#[derive(Debug, Clone)]
pub struct SimulatedSink {
    id: SinkId,
    config: SimulationConfig,
    state: Arc<Mutex<SinkState>>,
}

impl SimulatedSink {
    pub fn new(id: u64, config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(id));
        Self {
            id: SinkId(id),
            config,
            state: Arc::new(Mutex::new(SinkState {
                playing: false,
                source: None,
                pending: None,
                gesture_seen: false,
                rng,
            })),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    fn cancel_pending(state: &mut SinkState) {
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }
}

impl VideoSink for SimulatedSink {
    fn id(&self) -> SinkId {
        self.id
    }

    /// With autoplay blocked, the first request is refused. Later requests
    /// count as user gestures and succeed.
    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        if self.config.autoplay_blocked && !state.gesture_seen {
            state.gesture_seen = true;
            return Err(PlaybackError::PlayRejected {
                reason: "autoplay is not allowed without a user gesture".to_string(),
            });
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().playing = false;
    }

    fn set_source(&mut self, url: &str, events: EventSender) {
        let mut state = self.state.lock();
        Self::cancel_pending(&mut state);
        state.source = Some(url.to_string());

        let failed = state.rng.random::<f64>() < self.config.fatal_error_rate;
        state.pending = schedule(self.config.manifest_latency, move || {
            if failed {
                events.sink_error("MEDIA_ERR_NETWORK");
            } else {
                events.metadata_loaded();
            }
        });
    }

    fn remove_source(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        Self::cancel_pending(&mut state);
        state.source = None;
        state.playing = false;
        Ok(())
    }

    fn load(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn can_play_natively(&self, mime_type: &str) -> bool {
        self.config.native_playback && mime_type == HLS_MIME_TYPE
    }
}

#[cfg(test)]
mod tests {
    use camdeck_core::playback::{Epoch, PlaybackEventKind};
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_autoplay_blocked_only_once() {
        let config = SimulationConfig {
            autoplay_blocked: true,
            ..SimulationConfig::default()
        };
        let mut sink = SimulatedSink::new(1, config);

        assert!(matches!(sink.play(), Err(PlaybackError::PlayRejected { .. })));
        assert!(!sink.is_playing());
        assert!(sink.play().is_ok());
        assert!(sink.is_playing());
    }

    #[test]
    fn test_native_source_reports_metadata() {
        let config = SimulationConfig {
            native_playback: true,
            ..SimulationConfig::default()
        };
        let mut sink = SimulatedSink::new(2, config);
        assert!(sink.can_play_natively(HLS_MIME_TYPE));
        assert!(!sink.can_play_natively("video/mp4"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.set_source("https://cams.example.com/a.m3u8", EventSender::new(Epoch::new(1), tx));

        assert_eq!(rx.try_recv().unwrap().kind, PlaybackEventKind::MetadataLoaded);
        assert_eq!(sink.source().as_deref(), Some("https://cams.example.com/a.m3u8"));

        sink.remove_source().unwrap();
        assert!(sink.source().is_none());
    }

    #[test]
    fn test_native_source_failure() {
        let config = SimulationConfig {
            native_playback: true,
            fatal_error_rate: 1.0,
            ..SimulationConfig::default()
        };
        let mut sink = SimulatedSink::new(2, config);
        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.set_source("https://cams.example.com/a.m3u8", EventSender::new(Epoch::new(1), tx));

        assert_eq!(
            rx.try_recv().unwrap().kind,
            PlaybackEventKind::SinkError("MEDIA_ERR_NETWORK".to_string())
        );
    }
}
