//! Simulated adaptive streaming backend.

use std::sync::Arc;

use camdeck_core::playback::{
    ErrorDetail, EventSender, PlaybackError, SinkId, StreamingBackend, StreamingClient, VideoSink,
};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;

use crate::{FATAL_ERROR_DETAILS, RECOVERABLE_ERROR_DETAILS, SimulationConfig, schedule};

/// Creates [`SimulatedClient`]s, each with its own generator derived from
/// the backend's seed.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    config: SimulationConfig,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimulatedBackend {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

impl StreamingBackend for SimulatedBackend {
    fn is_supported(&self) -> bool {
        self.config.supported
    }

    fn create_client(&self, events: EventSender) -> Box<dyn StreamingClient> {
        let seed = self.rng.lock().random();
        Box::new(SimulatedClient::new(self.config.clone(), seed, events))
    }
}

/// Outcome of one simulated load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOutcome {
    Ready,
    RecoveredThenReady,
    Fatal,
}

/// Streaming client whose load attempts resolve after the configured
/// latency with a randomly rolled outcome.
#[derive(Debug)]
pub struct SimulatedClient {
    config: SimulationConfig,
    rng: ChaCha8Rng,
    events: EventSender,
    sink: Option<SinkId>,
    source: Option<String>,
    pending: Option<JoinHandle<()>>,
    attempts: u32,
    destroyed: bool,
}

impl SimulatedClient {
    pub fn new(config: SimulationConfig, seed: u64, events: EventSender) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events,
            sink: None,
            source: None,
            pending: None,
            attempts: 0,
            destroyed: false,
        }
    }

    /// Load attempts started so far, retries included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn attached_sink(&self) -> Option<SinkId> {
        self.sink
    }

    fn roll(&mut self) -> LoadOutcome {
        if self.rng.random::<f64>() < self.config.fatal_error_rate {
            LoadOutcome::Fatal
        } else if self.rng.random::<f64>() < self.config.recoverable_error_rate {
            LoadOutcome::RecoveredThenReady
        } else {
            LoadOutcome::Ready
        }
    }

    fn begin_attempt(&mut self) {
        if self.destroyed {
            tracing::debug!("Ignoring load on destroyed simulated client");
            return;
        }
        let Some(source) = self.source.clone() else {
            tracing::debug!("Ignoring load before a source was set");
            return;
        };

        self.attempts += 1;
        let outcome = self.roll();
        tracing::trace!(
            attempt = self.attempts,
            ?outcome,
            epoch = self.events.epoch().value(),
            "Simulated load of {}",
            source
        );

        if let Some(previous) = self.pending.take() {
            previous.abort();
        }
        let events = self.events.clone();
        self.pending = schedule(self.config.manifest_latency, move || match outcome {
            LoadOutcome::Ready => events.manifest_parsed(),
            LoadOutcome::RecoveredThenReady => {
                events.error(ErrorDetail::recoverable(RECOVERABLE_ERROR_DETAILS));
                events.manifest_parsed();
            }
            LoadOutcome::Fatal => events.error(ErrorDetail::fatal(FATAL_ERROR_DETAILS)),
        });
    }
}

impl StreamingClient for SimulatedClient {
    fn attach_media(&mut self, sink: &mut dyn VideoSink) {
        self.sink = Some(sink.id());
    }

    fn load_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.begin_attempt();
    }

    fn start_load(&mut self) {
        self.begin_attempt();
    }

    fn destroy(&mut self) -> Result<(), PlaybackError> {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.sink = None;
        self.destroyed = true;
        Ok(())
    }
}

impl Drop for SimulatedClient {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use camdeck_core::playback::{Epoch, PlaybackEvent, PlaybackEventKind};
    use tokio::sync::mpsc;

    use super::*;

    fn client(config: SimulationConfig) -> (SimulatedClient, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventSender::new(Epoch::new(3), tx);
        (SimulatedClient::new(config, 99, events), rx)
    }

    #[test]
    fn test_emits_synchronously_outside_runtime() {
        let (mut client, mut rx) = client(SimulationConfig::default());
        client.load_source("https://cams.example.com/a.m3u8");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.epoch, Epoch::new(3));
        assert_eq!(event.kind, PlaybackEventKind::ManifestParsed);
    }

    #[test]
    fn test_fatal_rate_one_always_fails() {
        let config = SimulationConfig {
            fatal_error_rate: 1.0,
            ..SimulationConfig::default()
        };
        let (mut client, mut rx) = client(config);
        client.load_source("https://cams.example.com/a.m3u8");
        client.start_load();

        for _ in 0..2 {
            assert_eq!(
                rx.try_recv().unwrap().kind,
                PlaybackEventKind::ClientError(ErrorDetail::fatal(FATAL_ERROR_DETAILS))
            );
        }
        assert_eq!(client.attempts(), 2);
    }

    #[test]
    fn test_start_load_without_source_is_ignored() {
        let (mut client, mut rx) = client(SimulationConfig::default());
        client.start_load();
        assert!(rx.try_recv().is_err());
        assert_eq!(client.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_arrives_after_latency() {
        let config = SimulationConfig {
            manifest_latency: Duration::from_millis(200),
            ..SimulationConfig::default()
        };
        let (mut client, mut rx) = client(config);
        client.load_source("https://cams.example.com/a.m3u8");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().unwrap().kind, PlaybackEventKind::ManifestParsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_cancels_pending_load() {
        let (mut client, mut rx) = client(SimulationConfig::default());
        client.load_source("https://cams.example.com/a.m3u8");
        client.destroy().unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        client.start_load();
        assert_eq!(client.attempts(), 1);
    }

    #[test]
    fn test_backend_is_deterministic() {
        let config = SimulationConfig {
            seed: 5,
            fatal_error_rate: 0.5,
            ..SimulationConfig::default()
        };

        let run = |config: SimulationConfig| {
            let backend = SimulatedBackend::new(config);
            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut kinds = Vec::new();
            for epoch in 0..8 {
                let mut client = backend.create_client(EventSender::new(Epoch::new(epoch), tx.clone()));
                client.load_source("https://cams.example.com/a.m3u8");
                kinds.push(rx.try_recv().unwrap().kind);
            }
            kinds
        };

        assert_eq!(run(config.clone()), run(config));
    }
}
