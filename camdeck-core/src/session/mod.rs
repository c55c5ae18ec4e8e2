//! Stream session: one playback attachment per camera slot
//!
//! The session is a plain owned state machine. It never blocks and never
//! returns errors; the owner drives it with operations and feeds playback
//! callbacks back in through [`StreamSession::handle_event`].

pub use source::{UrlRejection, validate_stream_url};
pub use state::{
    ConnectionState, HistoricalWindow, PlaybackMode, SessionSnapshot, WindowError,
};
pub use stream_session::{PlaybackEventReceiver, StreamSession};

mod source;
mod state;
mod stream_session;
