//! Session actor
//!
//! One tokio task owns a camera's [`StreamSession`](crate::session::StreamSession),
//! its alert log and its motion monitor. Commands from any number of
//! [`SessionHandle`] clones, playback callbacks and timer ticks are
//! serialized through that task, so the session never needs a lock.

pub mod actor;
pub mod commands;
pub mod handle;

pub use actor::spawn_session;
pub use commands::SessionCommand;
pub use handle::SessionHandle;
use thiserror::Error;

/// Errors talking to a session actor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session actor has shut down")]
    ActorShutdown,
}
