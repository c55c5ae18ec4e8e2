//! Command definitions for the session actor.

use tokio::sync::{broadcast, oneshot};

use crate::alerts::{Alert, AlertId};
use crate::monitor::PtzDirection;
use crate::session::{HistoricalWindow, PlaybackMode, SessionSnapshot};

/// Requests a [`SessionHandle`](super::SessionHandle) sends to the actor.
///
/// Every command carries a responder; operations that change the session
/// answer with the snapshot taken right after they ran.
pub enum SessionCommand {
    /// Open an explicit URL.
    Open {
        url: String,
        mode: PlaybackMode,
        window: Option<HistoricalWindow>,
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Open the camera's configured live stream.
    OpenLive {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Open the camera's configured recording source for a window.
    OpenRecording {
        window: HistoricalWindow,
        responder: oneshot::Sender<SessionSnapshot>,
    },
    Close {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Answers with the new playing intent.
    TogglePlayback { responder: oneshot::Sender<bool> },
    RetryNow {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    SwitchMode {
        mode: PlaybackMode,
        responder: oneshot::Sender<SessionSnapshot>,
    },
    Snapshot {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Alert log contents, newest first.
    Alerts { responder: oneshot::Sender<Vec<Alert>> },
    DeleteAlert {
        id: AlertId,
        responder: oneshot::Sender<bool>,
    },
    ClearAlerts { responder: oneshot::Sender<()> },
    SubscribeAlerts {
        responder: oneshot::Sender<broadcast::Receiver<Alert>>,
    },
    /// Answers with the acknowledging alert, if PTZ is enabled.
    Ptz {
        direction: PtzDirection,
        responder: oneshot::Sender<Option<AlertId>>,
    },
    SetMotionDetection {
        enabled: bool,
        responder: oneshot::Sender<()>,
    },
    /// Dispose the session and stop the actor.
    Shutdown { responder: oneshot::Sender<()> },
}
