//! Property tests of the session state machine.
//!
//! Random operation sequences, including callbacks from attachments that
//! were already released, run against the recording doubles.

use camdeck_core::alerts::{Alert, AlertEmitter};
use camdeck_core::config::{MAX_FATAL_RETRIES, SessionConfig};
use camdeck_core::playback::ErrorDetail;
use camdeck_core::session::PlaybackEventReceiver;
use camdeck_core::test_mocks::{RecordingBackend, RecordingSink};
use camdeck_core::{AlertIds, ConnectionState, PlaybackMode, StreamSession};
use chrono::NaiveDate;
use proptest::prelude::*;
use tokio::sync::mpsc;

const MAX_RETRIES: u32 = MAX_FATAL_RETRIES;

#[derive(Debug, Clone)]
enum Operation {
    OpenValid,
    OpenInvalid,
    OpenHistorical,
    Close,
    TogglePlayback,
    RetryNow,
    SwitchLive,
    SwitchHistorical,
    ManifestParsed,
    FatalError,
    RecoverableError,
    /// Callbacks from the oldest client ever created
    StaleManifest,
    StaleFatalError,
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => Just(Operation::OpenValid),
        1 => Just(Operation::OpenInvalid),
        1 => Just(Operation::OpenHistorical),
        1 => Just(Operation::Close),
        1 => Just(Operation::TogglePlayback),
        1 => Just(Operation::RetryNow),
        1 => Just(Operation::SwitchLive),
        1 => Just(Operation::SwitchHistorical),
        3 => Just(Operation::ManifestParsed),
        3 => Just(Operation::FatalError),
        1 => Just(Operation::RecoverableError),
        2 => Just(Operation::StaleManifest),
        2 => Just(Operation::StaleFatalError),
    ]
}

struct Harness {
    session: StreamSession,
    events: PlaybackEventReceiver,
    alerts: mpsc::UnboundedReceiver<Alert>,
    backend: RecordingBackend,
}

impl Harness {
    fn new() -> Self {
        let backend = RecordingBackend::new();
        let (emitter, alerts) = AlertEmitter::channel(Some(1), AlertIds::new());
        let config = SessionConfig {
            max_fatal_retries: MAX_RETRIES,
            ..SessionConfig::default()
        };
        let (session, events) = StreamSession::new(
            &config,
            Box::new(backend.clone()),
            Box::new(RecordingSink::new(1)),
            emitter,
        );
        Self {
            session,
            events,
            alerts,
            backend,
        }
    }

    fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.session.handle_event(event);
        }
    }

    fn alert_count(&mut self) -> usize {
        let mut count = 0;
        while self.alerts.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    fn current_client_events(&self) -> Option<camdeck_core::playback::EventSender> {
        self.backend
            .last_client()
            .filter(|client| !client.destroyed)
            .map(|client| client.events)
    }

    /// Applies one operation; returns whether it was a stale callback.
    fn apply(&mut self, operation: &Operation) -> bool {
        let window = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|date| camdeck_core::HistoricalWindow::new(date, 8, 12).ok());

        match operation {
            Operation::OpenValid => self.session.open(
                "https://cams.example.com/lobby.m3u8",
                PlaybackMode::Live,
                None,
            ),
            Operation::OpenInvalid => self.session.open("ftp://nope", PlaybackMode::Live, None),
            Operation::OpenHistorical => self.session.open(
                "https://nvr.example.com/lobby.m3u8",
                PlaybackMode::Historical,
                window,
            ),
            Operation::Close => self.session.close(),
            Operation::TogglePlayback => {
                self.session.toggle_playback();
            }
            Operation::RetryNow => self.session.retry_now(),
            Operation::SwitchLive => self.session.switch_mode(PlaybackMode::Live),
            Operation::SwitchHistorical => self.session.switch_mode(PlaybackMode::Historical),
            Operation::ManifestParsed => {
                if let Some(events) = self.current_client_events() {
                    events.manifest_parsed();
                }
            }
            Operation::FatalError => {
                if let Some(events) = self.current_client_events() {
                    events.error(ErrorDetail::fatal("networkError"));
                }
            }
            Operation::RecoverableError => {
                if let Some(events) = self.current_client_events() {
                    events.error(ErrorDetail::recoverable("bufferStalledError"));
                }
            }
            Operation::StaleManifest | Operation::StaleFatalError => {
                if self.backend.clients_created() < 2 {
                    return false;
                }
                let oldest = self.backend.client(0);
                if oldest.events.epoch() == self.session.epoch() {
                    return false;
                }
                if matches!(operation, Operation::StaleManifest) {
                    oldest.events.manifest_parsed();
                } else {
                    oldest.events.error(ErrorDetail::fatal("networkError"));
                }
                return true;
            }
        }
        false
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_session_invariants_hold(operations in prop::collection::vec(operation(), 1..60)) {
        let mut harness = Harness::new();
        let mut left_idle = false;

        for operation in &operations {
            let before = harness.session.snapshot();
            let stale = harness.apply(operation);
            harness.pump();
            let after = harness.session.snapshot();

            prop_assert!(harness.backend.live_clients() <= 1);
            prop_assert!(after.retry_count <= MAX_RETRIES);
            if after.connection_state == ConnectionState::Connected
                && before.connection_state != ConnectionState::Connected
            {
                prop_assert!(harness.session.has_attachment());
            }
            if after.connection_state == ConnectionState::Failed {
                prop_assert_eq!(harness.backend.live_clients(), 0);
            }
            if stale {
                prop_assert_eq!(&before, &after);
            }
            if left_idle {
                prop_assert_ne!(after.connection_state, ConnectionState::Idle);
            }
            left_idle |= after.connection_state != ConnectionState::Idle;
        }

        harness.session.dispose();
        prop_assert_eq!(harness.session.connection_state(), ConnectionState::Idle);
        prop_assert_eq!(harness.backend.live_clients(), 0);
    }

    #[test]
    fn prop_toggle_twice_restores_intent(operations in prop::collection::vec(operation(), 0..20)) {
        let mut harness = Harness::new();
        for operation in &operations {
            harness.apply(operation);
            harness.pump();
        }

        let intent = harness.session.is_playing_intent();
        let state = harness.session.connection_state();
        harness.session.toggle_playback();
        harness.session.toggle_playback();

        prop_assert_eq!(harness.session.is_playing_intent(), intent);
        prop_assert_eq!(harness.session.connection_state(), state);
    }

    #[test]
    fn prop_exhausted_retries_alert_once(extra_errors in 0usize..5) {
        let mut harness = Harness::new();
        harness.session.open("https://cams.example.com/lobby.m3u8", PlaybackMode::Live, None);
        let events = harness.current_client_events();
        prop_assert!(events.is_some());
        let events = events.unwrap();

        for _ in 0..(MAX_RETRIES as usize + 1 + extra_errors) {
            events.error(ErrorDetail::fatal("networkError"));
            harness.pump();
        }

        prop_assert_eq!(harness.session.connection_state(), ConnectionState::Failed);
        prop_assert_eq!(harness.backend.client(0).start_loads(), MAX_RETRIES as usize);
        prop_assert_eq!(harness.alert_count(), 1);
    }
}
