//! Handle for communicating with a session actor.

use tokio::sync::{broadcast, mpsc, oneshot};

use super::SessionError;
use super::commands::SessionCommand;
use crate::alerts::{Alert, AlertId};
use crate::monitor::PtzDirection;
use crate::session::{HistoricalWindow, PlaybackMode, SessionSnapshot};
use crate::settings::CameraId;

/// Async API of one camera session.
///
/// Cheap to clone; all clones talk to the same actor. Every method fails
/// with `SessionError::ActorShutdown` once the actor has stopped, and with
/// nothing else: playback failures show up in snapshots and alerts.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    camera_id: CameraId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(camera_id: CameraId, sender: mpsc::Sender<SessionCommand>) -> Self {
        Self { camera_id, sender }
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    /// Opens `url`, replacing the current attachment.
    ///
    /// Returns the snapshot right after the attempt started; the connection
    /// outcome arrives later.
    pub async fn open(
        &self,
        url: &str,
        mode: PlaybackMode,
        window: Option<HistoricalWindow>,
    ) -> Result<SessionSnapshot, SessionError> {
        let url = url.to_string();
        self.request(|responder| SessionCommand::Open {
            url,
            mode,
            window,
            responder,
        })
        .await
    }

    /// Opens the camera's configured live stream.
    pub async fn open_live(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|responder| SessionCommand::OpenLive { responder })
            .await
    }

    /// Opens the camera's recording source for `window`.
    pub async fn open_recording(
        &self,
        window: HistoricalWindow,
    ) -> Result<SessionSnapshot, SessionError> {
        self.request(|responder| SessionCommand::OpenRecording { window, responder })
            .await
    }

    pub async fn close(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|responder| SessionCommand::Close { responder })
            .await
    }

    /// Flips the playing intent and returns the new value.
    pub async fn toggle_playback(&self) -> Result<bool, SessionError> {
        self.request(|responder| SessionCommand::TogglePlayback { responder })
            .await
    }

    pub async fn retry_now(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|responder| SessionCommand::RetryNow { responder })
            .await
    }

    pub async fn switch_mode(&self, mode: PlaybackMode) -> Result<SessionSnapshot, SessionError> {
        self.request(|responder| SessionCommand::SwitchMode { mode, responder })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|responder| SessionCommand::Snapshot { responder })
            .await
    }

    /// Alert log, newest first.
    pub async fn alerts(&self) -> Result<Vec<Alert>, SessionError> {
        self.request(|responder| SessionCommand::Alerts { responder })
            .await
    }

    /// Removes one alert from the log. Returns whether it was present.
    pub async fn delete_alert(&self, id: AlertId) -> Result<bool, SessionError> {
        self.request(|responder| SessionCommand::DeleteAlert { id, responder })
            .await
    }

    pub async fn clear_alerts(&self) -> Result<(), SessionError> {
        self.request(|responder| SessionCommand::ClearAlerts { responder })
            .await
    }

    /// Subscribes to alerts emitted from now on.
    pub async fn subscribe_alerts(&self) -> Result<broadcast::Receiver<Alert>, SessionError> {
        self.request(|responder| SessionCommand::SubscribeAlerts { responder })
            .await
    }

    /// Sends a PTZ command. Returns the acknowledging alert, or None when
    /// the camera has PTZ disabled.
    pub async fn ptz(&self, direction: PtzDirection) -> Result<Option<AlertId>, SessionError> {
        self.request(|responder| SessionCommand::Ptz {
            direction,
            responder,
        })
        .await
    }

    pub async fn set_motion_detection(&self, enabled: bool) -> Result<(), SessionError> {
        self.request(|responder| SessionCommand::SetMotionDetection { enabled, responder })
            .await
    }

    /// Disposes the session and stops the actor.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|responder| SessionCommand::Shutdown { responder })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (responder, rx) = oneshot::channel();

        self.sender
            .send(command(responder))
            .await
            .map_err(|_| SessionError::ActorShutdown)?;

        rx.await.map_err(|_| SessionError::ActorShutdown)
    }
}
