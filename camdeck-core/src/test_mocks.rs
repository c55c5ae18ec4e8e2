//! Recording doubles of the playback stack for testing sessions.
//!
//! Both doubles share their state behind an `Arc`, so a test keeps one clone
//! for inspection while the session owns the other.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::playback::{
    EventSender, HLS_MIME_TYPE, PlaybackError, SinkId, StreamingBackend, StreamingClient,
    VideoSink,
};

/// Call made on a recording streaming client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    AttachMedia(SinkId),
    LoadSource(String),
    StartLoad,
    Destroy,
}

/// Everything a recording client saw, plus its callback handle.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub events: EventSender,
    pub calls: Vec<ClientCall>,
    pub destroyed: bool,
}

impl ClientRecord {
    pub fn start_loads(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == ClientCall::StartLoad)
            .count()
    }
}

#[derive(Debug, Default)]
struct BackendState {
    clients: Vec<ClientRecord>,
}

/// Streaming backend that records every client it creates.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    supported: bool,
    fail_destroy: bool,
    state: Arc<Mutex<BackendState>>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    /// Creates a backend that supports adaptive streaming.
    pub fn new() -> Self {
        Self {
            supported: true,
            fail_destroy: false,
            state: Arc::new(Mutex::new(BackendState::default())),
        }
    }

    /// Creates a backend for an environment without adaptive streaming.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Makes every client's `destroy` report an error (after releasing).
    pub fn with_failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    pub fn clients_created(&self) -> usize {
        self.state.lock().clients.len()
    }

    /// Clients created and not yet destroyed.
    pub fn live_clients(&self) -> usize {
        self.state
            .lock()
            .clients
            .iter()
            .filter(|client| !client.destroyed)
            .count()
    }

    /// Snapshot of one client's record.
    ///
    /// # Panics
    ///
    /// Panics if no client with that index was created.
    pub fn client(&self, index: usize) -> ClientRecord {
        self.state.lock().clients[index].clone()
    }

    pub fn last_client(&self) -> Option<ClientRecord> {
        self.state.lock().clients.last().cloned()
    }
}

impl StreamingBackend for RecordingBackend {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_client(&self, events: EventSender) -> Box<dyn StreamingClient> {
        let mut state = self.state.lock();
        state.clients.push(ClientRecord {
            events,
            calls: Vec::new(),
            destroyed: false,
        });
        Box::new(RecordingClient {
            index: state.clients.len() - 1,
            fail_destroy: self.fail_destroy,
            state: Arc::clone(&self.state),
        })
    }
}

struct RecordingClient {
    index: usize,
    fail_destroy: bool,
    state: Arc<Mutex<BackendState>>,
}

impl RecordingClient {
    fn record(&self, call: ClientCall) {
        self.state.lock().clients[self.index].calls.push(call);
    }
}

impl StreamingClient for RecordingClient {
    fn attach_media(&mut self, sink: &mut dyn VideoSink) {
        self.record(ClientCall::AttachMedia(sink.id()));
    }

    fn load_source(&mut self, url: &str) {
        self.record(ClientCall::LoadSource(url.to_string()));
    }

    fn start_load(&mut self) {
        self.record(ClientCall::StartLoad);
    }

    fn destroy(&mut self) -> Result<(), PlaybackError> {
        self.record(ClientCall::Destroy);
        self.state.lock().clients[self.index].destroyed = true;
        if self.fail_destroy {
            return Err(PlaybackError::TeardownFailed {
                reason: "mock destroy failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Call made on a recording sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Play,
    Pause,
    SetSource(String),
    RemoveSource,
    Load,
}

#[derive(Debug, Default)]
struct SinkState {
    playing: bool,
    source: Option<String>,
    native_events: Option<EventSender>,
    calls: Vec<SinkCall>,
}

/// Video sink that records calls and can be told to misbehave.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    id: SinkId,
    native: bool,
    reject_play: bool,
    fail_teardown: bool,
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new(id: u64) -> Self {
        Self {
            id: SinkId(id),
            native: false,
            reject_play: false,
            fail_teardown: false,
            state: Arc::new(Mutex::new(SinkState::default())),
        }
    }

    /// Sink that can play HLS without a streaming client.
    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    /// Sink whose play requests are always rejected (autoplay policy).
    pub fn rejecting_play(mut self) -> Self {
        self.reject_play = true;
        self
    }

    /// Sink whose source removal and reload always fail.
    pub fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().calls.clone()
    }

    pub fn play_requests(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == SinkCall::Play)
            .count()
    }

    /// Callback handle registered by the last native `set_source`.
    pub fn native_events(&self) -> Option<EventSender> {
        self.state.lock().native_events.clone()
    }

    fn teardown_result(&self, operation: &str) -> Result<(), PlaybackError> {
        if self.fail_teardown {
            Err(PlaybackError::SinkFailed {
                reason: format!("mock {operation} failure"),
            })
        } else {
            Ok(())
        }
    }
}

impl VideoSink for RecordingSink {
    fn id(&self) -> SinkId {
        self.id
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Play);
        if self.reject_play {
            return Err(PlaybackError::PlayRejected {
                reason: "autoplay blocked".to_string(),
            });
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Pause);
        state.playing = false;
    }

    fn set_source(&mut self, url: &str, events: EventSender) {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::SetSource(url.to_string()));
        state.source = Some(url.to_string());
        state.native_events = Some(events);
    }

    fn remove_source(&mut self) -> Result<(), PlaybackError> {
        {
            let mut state = self.state.lock();
            state.calls.push(SinkCall::RemoveSource);
            state.source = None;
            state.native_events = None;
        }
        self.teardown_result("remove source")
    }

    fn load(&mut self) -> Result<(), PlaybackError> {
        self.state.lock().calls.push(SinkCall::Load);
        self.teardown_result("load")
    }

    fn can_play_natively(&self, mime_type: &str) -> bool {
        self.native && mime_type == HLS_MIME_TYPE
    }
}
