//! Seams to the external playback stack.
//!
//! The streaming library and the video element are collaborators, not part
//! of this crate. They are reached through the traits in [`traits`] and talk
//! back through an epoch-stamped [`EventSender`] instead of closures, so a
//! session can tell which attachment a callback belongs to.

pub mod events;
pub mod traits;

pub use events::{Epoch, ErrorDetail, EventSender, PlaybackEvent, PlaybackEventKind};
pub use traits::{
    HLS_MIME_TYPE, PlaybackError, SinkId, StreamingBackend, StreamingClient, VideoSink,
};
