//! Actor implementation for a camera session.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::commands::SessionCommand;
use super::handle::SessionHandle;
use crate::alerts::{Alert, AlertEmitter, AlertId, AlertIds, AlertLog};
use crate::config::CamdeckConfig;
use crate::monitor::{MotionMonitor, PtzDirection, ptz_alert_message};
use crate::playback::{StreamingBackend, VideoSink};
use crate::session::{
    ConnectionState, PlaybackEventReceiver, PlaybackMode, SessionSnapshot, StreamSession,
};
use crate::settings::{CameraId, CameraSettings};

/// Spawns the actor for one camera slot and returns its handle.
///
/// The session starts idle; nothing is opened until the first command.
/// Must be called from within a tokio runtime.
///
/// # Examples
/// ```rust,ignore
/// # #[tokio::main]
/// # async fn main() {
/// use camdeck_core::engine::spawn_session;
/// use camdeck_core::test_mocks::{RecordingBackend, RecordingSink};
/// use camdeck_core::{AlertIds, CamdeckConfig, CameraSettings};
///
/// let settings = CameraSettings::with_stream("Lobby", "https://cams.example.com/lobby.m3u8");
/// let handle = spawn_session(
///     1,
///     settings,
///     &CamdeckConfig::default(),
///     Box::new(RecordingBackend::new()),
///     Box::new(RecordingSink::new(1)),
///     AlertIds::new(),
/// );
/// handle.open_live().await.unwrap();
/// # }
/// ```
pub fn spawn_session(
    camera_id: CameraId,
    settings: CameraSettings,
    config: &CamdeckConfig,
    backend: Box<dyn StreamingBackend>,
    sink: Box<dyn VideoSink>,
    alert_ids: AlertIds,
) -> SessionHandle {
    let (sender, commands) = mpsc::channel(config.session.command_buffer.max(1));
    let (alerts, alert_receiver) = AlertEmitter::channel(Some(camera_id), alert_ids);
    let (session, playback_events) =
        StreamSession::new(&config.session, backend, sink, alerts.clone());
    let (alert_broadcast, _) = broadcast::channel(config.alerts.broadcast_capacity.max(1));

    let actor = SessionActor {
        camera_id,
        motion: MotionMonitor::new(&settings, config.monitor.motion_seed),
        settings,
        session,
        alerts,
        alert_receiver,
        log: AlertLog::new(config.alerts.capacity),
        alert_broadcast,
    };

    let motion_interval = config.monitor.motion_interval;
    tokio::spawn(async move {
        run_actor_loop(actor, commands, playback_events, motion_interval).await;
    });

    SessionHandle::new(camera_id, sender)
}

struct SessionActor {
    camera_id: CameraId,
    settings: CameraSettings,
    session: StreamSession,
    motion: MotionMonitor,
    alerts: AlertEmitter,
    alert_receiver: mpsc::UnboundedReceiver<Alert>,
    log: AlertLog,
    alert_broadcast: broadcast::Sender<Alert>,
}

/// Runs the actor until shutdown or until every handle is dropped.
///
/// Playback callbacks are polled before commands, so a command always sees
/// every callback delivered ahead of it.
async fn run_actor_loop(
    mut actor: SessionActor,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut playback_events: PlaybackEventReceiver,
    motion_interval: Duration,
) {
    tracing::debug!(camera = actor.camera_id, "Session actor started");

    let mut motion_timer = time::interval_at(Instant::now() + motion_interval, motion_interval);
    motion_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            Some(event) = playback_events.recv() => {
                actor.session.handle_event(event);
                actor.drain_alerts();
            }
            command = commands.recv() => {
                actor.drain_alerts();
                let keep_running = match command {
                    Some(command) => actor.handle_command(command),
                    None => false,
                };
                if !keep_running {
                    break;
                }
            }
            _ = motion_timer.tick() => {
                actor.check_motion();
                actor.drain_alerts();
            }
        }
    }

    if actor.session.connection_state() != ConnectionState::Idle {
        actor.session.dispose();
        actor.drain_alerts();
    }
    tracing::debug!(camera = actor.camera_id, "Session actor stopped");
}

impl SessionActor {
    /// Handles a single command. Returns false to shut down.
    fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Open {
                url,
                mode,
                window,
                responder,
            } => {
                self.session.open(&url, mode, window);
                self.respond_snapshot(responder);
            }

            SessionCommand::OpenLive { responder } => {
                let url = self.settings.live_url().to_string();
                self.session.open(&url, PlaybackMode::Live, None);
                self.respond_snapshot(responder);
            }

            SessionCommand::OpenRecording { window, responder } => {
                let url = self.settings.playback_url().to_string();
                self.session
                    .open(&url, PlaybackMode::Historical, Some(window));
                self.respond_snapshot(responder);
            }

            SessionCommand::Close { responder } => {
                self.session.close();
                self.respond_snapshot(responder);
            }

            SessionCommand::TogglePlayback { responder } => {
                let playing = self.session.toggle_playback();
                let _ = responder.send(playing);
            }

            SessionCommand::RetryNow { responder } => {
                self.session.retry_now();
                self.respond_snapshot(responder);
            }

            SessionCommand::SwitchMode { mode, responder } => {
                self.session.switch_mode(mode);
                self.respond_snapshot(responder);
            }

            SessionCommand::Snapshot { responder } => {
                let _ = responder.send(self.session.snapshot());
            }

            SessionCommand::Alerts { responder } => {
                let _ = responder.send(self.log.to_vec());
            }

            SessionCommand::DeleteAlert { id, responder } => {
                let _ = responder.send(self.log.delete(id));
            }

            SessionCommand::ClearAlerts { responder } => {
                self.log.clear();
                let _ = responder.send(());
            }

            SessionCommand::SubscribeAlerts { responder } => {
                let _ = responder.send(self.alert_broadcast.subscribe());
            }

            SessionCommand::Ptz {
                direction,
                responder,
            } => {
                let id = self.ptz(direction);
                let _ = responder.send(id);
            }

            SessionCommand::SetMotionDetection { enabled, responder } => {
                tracing::debug!(camera = self.camera_id, enabled, "Motion detection toggled");
                self.motion.set_enabled(enabled);
                self.settings.motion_detection = enabled;
                let _ = responder.send(());
            }

            SessionCommand::Shutdown { responder } => {
                tracing::debug!(camera = self.camera_id, "Session actor shutting down");
                self.session.dispose();
                self.drain_alerts();
                let _ = responder.send(());
                return false;
            }
        }
        self.drain_alerts();
        true
    }

    fn respond_snapshot(&mut self, responder: oneshot::Sender<SessionSnapshot>) {
        self.drain_alerts();
        let _ = responder.send(self.session.snapshot());
    }

    fn ptz(&mut self, direction: PtzDirection) -> Option<AlertId> {
        match ptz_alert_message(&self.settings, direction) {
            Some(message) => Some(self.alerts.info(message)),
            None => {
                tracing::debug!(camera = self.camera_id, %direction, "PTZ disabled, ignoring");
                None
            }
        }
    }

    fn check_motion(&mut self) {
        if let Some(message) = self.motion.tick() {
            self.alerts.warning(message);
        }
    }

    /// Moves freshly emitted alerts into the log and out to subscribers.
    fn drain_alerts(&mut self) {
        while let Ok(alert) = self.alert_receiver.try_recv() {
            // No subscribers is not an error
            let _ = self.alert_broadcast.send(alert.clone());
            self.log.push(alert);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::alerts::AlertLevel;
    use crate::engine::SessionError;
    use crate::session::HistoricalWindow;
    use crate::test_mocks::{ClientCall, RecordingBackend, RecordingSink};

    const LIVE_URL: &str = "https://cams.example.com/gate/live.m3u8";
    const RECORDED_URL: &str = "https://nvr.example.com/gate/vod.m3u8";

    fn gate_settings() -> CameraSettings {
        let mut settings = CameraSettings::with_stream("Gate", LIVE_URL);
        settings.data_source.playback_url = Some(RECORDED_URL.to_string());
        settings
    }

    fn spawn_gate(settings: CameraSettings) -> (SessionHandle, RecordingBackend, RecordingSink) {
        let backend = RecordingBackend::new();
        let sink = RecordingSink::new(9);
        let handle = spawn_session(
            3,
            settings,
            &CamdeckConfig::deterministic_testing(),
            Box::new(backend.clone()),
            Box::new(sink.clone()),
            AlertIds::new(),
        );
        (handle, backend, sink)
    }

    #[tokio::test]
    async fn test_actor_open_live_and_connect() {
        let (handle, backend, sink) = spawn_gate(gate_settings());

        let snapshot = handle.open_live().await.unwrap();
        assert_eq!(snapshot.connection_state, ConnectionState::Connecting);
        assert_eq!(snapshot.source_url, LIVE_URL);

        backend.client(0).events.manifest_parsed();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.connection_state, ConnectionState::Connected);
        assert!(sink.is_playing());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_open_recording_uses_playback_url() {
        let (handle, backend, _sink) = spawn_gate(gate_settings());
        let window =
            HistoricalWindow::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), 9, 17).unwrap();

        handle.open_recording(window).await.unwrap();
        assert!(
            backend
                .client(0)
                .calls
                .contains(&ClientCall::LoadSource(RECORDED_URL.to_string()))
        );

        backend.client(0).events.manifest_parsed();
        let alerts = handle.alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].message,
            "Loaded recording for 2024-03-05 09:00–17:00"
        );
        assert_eq!(alerts[0].camera, Some(3));
    }

    #[tokio::test]
    async fn test_actor_alert_log_operations() {
        let (handle, _backend, _sink) = spawn_gate(gate_settings());

        handle
            .open("ftp://cams.example.com/gate", PlaybackMode::Live, None)
            .await
            .unwrap();
        handle
            .open("", PlaybackMode::Live, None)
            .await
            .unwrap();

        let alerts = handle.alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].id > alerts[1].id);

        assert!(handle.delete_alert(alerts[0].id).await.unwrap());
        assert!(!handle.delete_alert(alerts[0].id).await.unwrap());
        assert_eq!(handle.alerts().await.unwrap().len(), 1);

        handle.clear_alerts().await.unwrap();
        assert!(handle.alerts().await.unwrap().is_empty());
        assert!(handle.snapshot().await.unwrap().connection_state.is_failed());
    }

    #[tokio::test]
    async fn test_actor_broadcasts_alerts() {
        let (handle, _backend, _sink) = spawn_gate(gate_settings());
        let mut subscriber = handle.subscribe_alerts().await.unwrap();

        handle
            .open("not a url", PlaybackMode::Live, None)
            .await
            .unwrap();

        let alert = subscriber.recv().await.unwrap();
        assert_eq!(alert.message, "Invalid stream URL");
        assert_eq!(alert.level, AlertLevel::Error);
    }

    #[tokio::test]
    async fn test_actor_ptz_respects_settings() {
        let (handle, _backend, _sink) = spawn_gate(gate_settings());
        assert_eq!(handle.ptz(PtzDirection::Up).await.unwrap(), None);

        let mut settings = gate_settings();
        settings.ptz = true;
        let (handle, _backend, _sink) = spawn_gate(settings);
        let id = handle.ptz(PtzDirection::ZoomIn).await.unwrap();
        assert!(id.is_some());

        let alerts = handle.alerts().await.unwrap();
        assert_eq!(alerts[0].message, "PTZ: zoom-in on Gate");
        assert_eq!(alerts[0].level, AlertLevel::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_motion_alerts_follow_timer() {
        let mut settings = gate_settings();
        settings.motion_detection = true;
        settings.motion_sensitivity = 100;
        let (handle, _backend, _sink) = spawn_gate(settings);

        tokio::time::sleep(Duration::from_secs(25)).await;
        let alerts = handle.alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|alert| alert.level == AlertLevel::Warning));
        assert_eq!(alerts[0].message, "Motion detected on Gate");

        handle.set_motion_detection(false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.alerts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_actor_shutdown_disposes_session() {
        let (handle, backend, _sink) = spawn_gate(gate_settings());
        handle.open_live().await.unwrap();
        assert_eq!(backend.live_clients(), 1);

        handle.shutdown().await.unwrap();

        assert_eq!(backend.live_clients(), 0);
        assert_eq!(handle.snapshot().await, Err(SessionError::ActorShutdown));
    }

    #[tokio::test]
    async fn test_actor_stops_when_handles_dropped() {
        let (handle, backend, _sink) = spawn_gate(gate_settings());
        handle.open_live().await.unwrap();

        drop(handle);
        for _ in 0..50 {
            if backend.live_clients() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(backend.live_clients(), 0);
    }
}
