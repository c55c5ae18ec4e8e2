//! Session actors over the simulated playback stack.

use std::time::Duration;

use camdeck_core::engine::spawn_session;
use camdeck_core::{
    AlertIds, AlertLevel, CamdeckConfig, CameraSettings, ConnectionState, HistoricalWindow,
    PlaybackMode, SessionHandle,
};
use camdeck_sim::{FATAL_ERROR_DETAILS, SimulatedBackend, SimulatedSink, SimulationConfig};
use chrono::NaiveDate;

const LOBBY_URL: &str = "https://cams.example.com/lobby/index.m3u8";
const DOCK_URL: &str = "https://cams.example.com/dock/index.m3u8";

/// Long enough for any simulated load, retries included.
const SETTLE: Duration = Duration::from_secs(2);

struct SimulatedCamera {
    handle: SessionHandle,
    sink: SimulatedSink,
}

impl SimulatedCamera {
    fn spawn(settings: CameraSettings, simulation: SimulationConfig) -> Self {
        let sink = SimulatedSink::new(1, simulation.clone());
        let handle = spawn_session(
            1,
            settings,
            &CamdeckConfig::deterministic_testing(),
            Box::new(SimulatedBackend::new(simulation)),
            Box::new(sink.clone()),
            AlertIds::new(),
        );
        Self { handle, sink }
    }

    fn lobby(simulation: SimulationConfig) -> Self {
        Self::spawn(CameraSettings::with_stream("Lobby", LOBBY_URL), simulation)
    }
}

#[tokio::test(start_paused = true)]
async fn test_live_stream_connects_and_plays() {
    let camera = SimulatedCamera::lobby(SimulationConfig::default());

    let snapshot = camera.handle.open_live().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Connecting);

    tokio::time::sleep(SETTLE).await;

    let snapshot = camera.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.retry_count, 0);
    assert!(camera.sink.is_playing());
    assert!(camera.handle.alerts().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_persistent_failures_exhaust_retries() {
    let simulation = SimulationConfig {
        fatal_error_rate: 1.0,
        ..SimulationConfig::default()
    };
    let camera = SimulatedCamera::lobby(simulation);

    camera.handle.open_live().await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let snapshot = camera.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Failed);
    assert_eq!(snapshot.retry_count, 2);

    let alerts = camera.handle.alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Error);
    assert_eq!(
        alerts[0].message,
        format!("Stream error: {FATAL_ERROR_DETAILS}")
    );
    assert!(!camera.sink.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_blocked_autoplay_is_recorded_and_recoverable() {
    let simulation = SimulationConfig {
        autoplay_blocked: true,
        ..SimulationConfig::default()
    };
    let camera = SimulatedCamera::lobby(simulation);

    camera.handle.open_live().await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let snapshot = camera.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert!(snapshot.last_error.is_some());
    assert!(!camera.sink.is_playing());
    assert!(camera.handle.alerts().await.unwrap().is_empty());

    assert!(!camera.handle.toggle_playback().await.unwrap());
    assert!(camera.handle.toggle_playback().await.unwrap());
    assert!(camera.sink.is_playing());
    assert_eq!(
        camera.handle.snapshot().await.unwrap().connection_state,
        ConnectionState::Connected
    );
}

#[tokio::test(start_paused = true)]
async fn test_rapid_switching_settles_on_last_source() {
    let camera = SimulatedCamera::lobby(SimulationConfig::default());

    camera.handle.open_live().await.unwrap();
    camera
        .handle
        .open(DOCK_URL, PlaybackMode::Live, None)
        .await
        .unwrap();
    camera
        .handle
        .switch_mode(PlaybackMode::Historical)
        .await
        .unwrap();
    let before_settle = camera
        .handle
        .switch_mode(PlaybackMode::Live)
        .await
        .unwrap();

    tokio::time::sleep(SETTLE).await;

    let snapshot = camera.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.source_url, DOCK_URL);
    assert_eq!(snapshot.mode, PlaybackMode::Live);
    assert_eq!(snapshot.epoch, before_settle.epoch);
    assert!(camera.handle.alerts().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_native_playback_when_backend_unsupported() {
    let simulation = SimulationConfig {
        supported: false,
        native_playback: true,
        ..SimulationConfig::default()
    };
    let camera = SimulatedCamera::lobby(simulation);

    camera.handle.open_live().await.unwrap();
    assert_eq!(camera.sink.source().as_deref(), Some(LOBBY_URL));
    tokio::time::sleep(SETTLE).await;

    assert!(
        camera
            .handle
            .snapshot()
            .await
            .unwrap()
            .connection_state
            .is_connected()
    );
    assert!(camera.sink.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_no_playback_capability_fails() {
    let simulation = SimulationConfig {
        supported: false,
        ..SimulationConfig::default()
    };
    let camera = SimulatedCamera::lobby(simulation);

    let snapshot = camera.handle.open_live().await.unwrap();

    assert!(snapshot.connection_state.is_failed());
    let alerts = camera.handle.alerts().await.unwrap();
    assert_eq!(alerts[0].message, "Stream format not supported");
}

#[tokio::test(start_paused = true)]
async fn test_recording_playback_announces_window() {
    let mut settings = CameraSettings::with_stream("Lobby", LOBBY_URL);
    settings.data_source.playback_url = Some("https://nvr.example.com/lobby/vod.m3u8".into());
    let camera = SimulatedCamera::spawn(settings, SimulationConfig::default());
    let window =
        HistoricalWindow::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), 9, 17).unwrap();

    let snapshot = camera.handle.open_recording(window).await.unwrap();
    assert_eq!(snapshot.mode, PlaybackMode::Historical);
    assert_eq!(snapshot.source_url, "https://nvr.example.com/lobby/vod.m3u8");

    tokio::time::sleep(SETTLE).await;

    let alerts = camera.handle.alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Info);
    assert_eq!(
        alerts[0].message,
        "Loaded recording for 2024-03-05 09:00–17:00"
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_now_recovers_after_failure() {
    let settings = CameraSettings::with_stream("Lobby", "rtsp://cams.example.com/lobby");
    let camera = SimulatedCamera::spawn(settings, SimulationConfig::default());

    let snapshot = camera.handle.open_live().await.unwrap();
    assert!(snapshot.connection_state.is_failed());

    camera
        .handle
        .open(LOBBY_URL, PlaybackMode::Live, None)
        .await
        .unwrap();
    camera.handle.close().await.unwrap();
    let snapshot = camera.handle.retry_now().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Connecting);

    tokio::time::sleep(SETTLE).await;
    assert!(
        camera
            .handle
            .snapshot()
            .await
            .unwrap()
            .connection_state
            .is_connected()
    );
}
