//! Stream session lifecycle manager

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::source::validate_stream_url;
use super::state::{ConnectionState, HistoricalWindow, PlaybackMode, SessionSnapshot};
use crate::alerts::AlertEmitter;
use crate::config::SessionConfig;
use crate::playback::{
    Epoch, ErrorDetail, EventSender, HLS_MIME_TYPE, PlaybackEvent, PlaybackEventKind, SinkId,
    StreamingBackend, StreamingClient, VideoSink,
};

/// Receiving end of a session's playback callbacks.
pub type PlaybackEventReceiver = mpsc::UnboundedReceiver<PlaybackEvent>;

/// The one live binding between a session and its playback stack.
enum Attachment {
    /// Adaptive streaming client attached to the sink
    Client(Box<dyn StreamingClient>),
    /// Source set directly on a sink that plays it natively
    Native,
}

impl Attachment {
    fn kind(&self) -> AttachmentKind {
        match self {
            Attachment::Client(_) => AttachmentKind::Client,
            Attachment::Native => AttachmentKind::Native,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachmentKind {
    Client,
    Native,
}

/// Arguments of the most recent [`StreamSession::open`].
///
/// Kept apart from the selected mode: switching to historical changes the
/// mode before any recording is opened.
#[derive(Debug, Clone)]
struct OpenRequest {
    url: String,
    mode: PlaybackMode,
    window: Option<HistoricalWindow>,
}

/// Playback lifecycle of one camera slot.
///
/// Owns its sink and backend exclusively and holds at most one attachment at
/// a time. Every operation returns immediately; connection outcomes arrive
/// later as [`PlaybackEvent`]s that the owner feeds back through
/// [`StreamSession::handle_event`]. Failures never surface as errors: they
/// show up in the connection state and as alerts.
pub struct StreamSession {
    source_url: String,
    mode: PlaybackMode,
    window: Option<HistoricalWindow>,
    connection_state: ConnectionState,
    retry_count: u32,
    is_playing_intent: bool,
    last_error: Option<String>,
    epoch: Epoch,
    attachment: Option<Attachment>,
    last_open: Option<OpenRequest>,
    max_retries: u32,
    backend: Box<dyn StreamingBackend>,
    sink: Box<dyn VideoSink>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    alerts: AlertEmitter,
}

impl StreamSession {
    /// Creates an idle session and the receiver its callbacks arrive on.
    pub fn new(
        config: &SessionConfig,
        backend: Box<dyn StreamingBackend>,
        sink: Box<dyn VideoSink>,
        alerts: AlertEmitter,
    ) -> (Self, PlaybackEventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            source_url: String::new(),
            mode: PlaybackMode::Live,
            window: None,
            connection_state: ConnectionState::Idle,
            retry_count: 0,
            is_playing_intent: config.autoplay,
            last_error: None,
            epoch: Epoch::default(),
            attachment: None,
            last_open: None,
            max_retries: config.retry_ceiling(),
            backend,
            sink,
            events,
            alerts,
        };
        (session, receiver)
    }

    /// Opens `url` in `mode`, replacing whatever was attached before.
    ///
    /// Invalid URLs never reach the network: the session fails immediately
    /// with an alert. Otherwise the session moves to `Connecting` and the
    /// outcome arrives through [`Self::handle_event`].
    pub fn open(&mut self, url: &str, mode: PlaybackMode, window: Option<HistoricalWindow>) {
        self.close();

        self.last_open = Some(OpenRequest {
            url: url.to_string(),
            mode,
            window,
        });
        self.mode = mode;
        self.window = window;
        self.source_url = url.trim().to_string();

        let url = match validate_stream_url(url) {
            Ok(valid) => valid.to_string(),
            Err(rejection) => {
                debug!(%mode, "Refusing to open stream: {}", rejection);
                let message = match mode {
                    PlaybackMode::Live => "Invalid stream URL",
                    PlaybackMode::Historical => "Invalid playback stream URL",
                };
                self.fail(message);
                return;
            }
        };

        if mode == PlaybackMode::Historical && window.is_none() {
            self.fail("Missing recording window");
            return;
        }

        self.transition(ConnectionState::Connecting);
        self.retry_count = 0;

        let events = EventSender::new(self.epoch, self.events.clone());

        if self.backend.is_supported() {
            let mut client = self.backend.create_client(events);
            client.attach_media(self.sink.as_mut());
            client.load_source(&url);
            self.attachment = Some(Attachment::Client(client));
        } else if self.sink.can_play_natively(HLS_MIME_TYPE) {
            self.sink.set_source(&url, events);
            self.attachment = Some(Attachment::Native);
        } else {
            self.fail("Stream format not supported");
            return;
        }

        debug!(
            %mode,
            epoch = self.epoch.value(),
            "Attached {:?} playback for {}",
            self.attachment_kind(),
            url
        );
    }

    /// Releases the current attachment. Safe to call any number of times.
    ///
    /// Teardown errors are expected during rapid switches and are only
    /// logged. Advancing the epoch makes every callback registered so far
    /// stale.
    pub fn close(&mut self) {
        if let Some(Attachment::Client(mut client)) = self.attachment.take()
            && let Err(e) = client.destroy()
        {
            warn!("Ignoring streaming client teardown error: {}", e);
        }

        self.sink.pause();
        if let Err(e) = self.sink.remove_source() {
            debug!("Ignoring sink source removal error: {}", e);
        }
        if let Err(e) = self.sink.load() {
            debug!("Ignoring sink reload error: {}", e);
        }

        self.epoch = self.epoch.next();
    }

    /// Flips the playing intent and pauses or resumes the sink.
    ///
    /// Returns the new intent. A rejected play request is remembered as the
    /// last error but leaves the connection state alone.
    pub fn toggle_playback(&mut self) -> bool {
        if self.is_playing_intent {
            self.sink.pause();
            self.is_playing_intent = false;
        } else {
            self.is_playing_intent = true;
            self.request_play();
        }
        self.is_playing_intent
    }

    /// Re-opens the last used url, mode and window from scratch.
    ///
    /// Does nothing before the first `open`.
    pub fn retry_now(&mut self) {
        match self.last_open.clone() {
            Some(request) => self.open(&request.url, request.mode, request.window),
            None => debug!("Nothing to retry, session was never opened"),
        }
    }

    /// Switches between live and recorded playback.
    ///
    /// Going live re-opens the known URL right away. Going historical only
    /// records the mode; the caller picks a window and calls [`Self::open`].
    pub fn switch_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
        match mode {
            PlaybackMode::Live => {
                self.close();
                let url = self.source_url.clone();
                self.open(&url, PlaybackMode::Live, None);
            }
            PlaybackMode::Historical => {
                debug!("Historical mode selected, waiting for a recording window");
            }
        }
    }

    /// Tears down for good. The only way back to `Idle`.
    pub fn dispose(&mut self) {
        self.close();
        self.transition(ConnectionState::Idle);
    }

    /// Applies a playback callback.
    ///
    /// Returns false when the event was discarded because it belongs to an
    /// attachment that has since been released, or does not match the kind
    /// of the current one.
    pub fn handle_event(&mut self, event: PlaybackEvent) -> bool {
        if event.epoch != self.epoch {
            debug!(
                "Discarding stale playback event from {} (current {})",
                event.epoch, self.epoch
            );
            return false;
        }

        match (self.attachment_kind(), event.kind) {
            (Some(AttachmentKind::Client), PlaybackEventKind::ManifestParsed)
            | (Some(AttachmentKind::Native), PlaybackEventKind::MetadataLoaded) => self.on_ready(),
            (Some(AttachmentKind::Client), PlaybackEventKind::ClientError(detail)) => {
                self.on_client_error(detail)
            }
            (Some(AttachmentKind::Native), PlaybackEventKind::SinkError(reason)) => {
                self.on_sink_error(&reason)
            }
            (attached, kind) => {
                debug!("Discarding {:?} for attachment {:?}", kind, attached);
                return false;
            }
        }
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection_state: self.connection_state,
            retry_count: self.retry_count,
            last_error: self.last_error.clone(),
            is_playing_intent: self.is_playing_intent,
            mode: self.mode,
            source_url: self.source_url.clone(),
            window: self.window,
            epoch: self.epoch,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_playing_intent(&self) -> bool {
        self.is_playing_intent
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn sink_id(&self) -> SinkId {
        self.sink.id()
    }

    fn attachment_kind(&self) -> Option<AttachmentKind> {
        self.attachment.as_ref().map(Attachment::kind)
    }

    fn on_ready(&mut self) {
        let first_ready = self.connection_state != ConnectionState::Connected;

        self.transition(ConnectionState::Connected);
        self.retry_count = 0;
        self.last_error = None;
        info!(mode = %self.mode, "Stream connected: {}", self.source_url);

        if self.is_playing_intent {
            self.request_play();
        }

        if first_ready
            && self.mode == PlaybackMode::Historical
            && let Some(window) = &self.window
        {
            self.alerts
                .info(format!("Loaded recording for {}", window.describe()));
        }
    }

    fn on_client_error(&mut self, detail: ErrorDetail) {
        if !detail.fatal {
            debug!("Streaming client recovered from: {}", detail.details);
            return;
        }

        if self.retry_count < self.max_retries {
            self.retry_count += 1;
            warn!(
                "Fatal stream error '{}', restarting load (retry {}/{})",
                detail.details, self.retry_count, self.max_retries
            );
            if let Some(Attachment::Client(client)) = self.attachment.as_mut() {
                client.start_load();
            }
            return;
        }

        warn!(
            "Fatal stream error '{}' after {} retries, giving up",
            detail.details, self.retry_count
        );
        self.close();
        self.fail(&format!("Stream error: {}", detail.details));
    }

    fn on_sink_error(&mut self, reason: &str) {
        warn!("Native playback failed: {}", reason);
        self.close();
        self.fail("Playback failed to load");
    }

    fn request_play(&mut self) {
        if let Err(e) = self.sink.play() {
            warn!("Playback request failed: {}", e);
            self.last_error = Some(e.to_string());
        }
    }

    fn fail(&mut self, message: &str) {
        self.transition(ConnectionState::Failed);
        self.last_error = Some(message.to_string());
        self.alerts.error(message);
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.connection_state != next {
            debug!("Session {} -> {}", self.connection_state, next);
        }
        self.connection_state = next;
    }
}
