//! Periodic side effects that run next to a stream session.
//!
//! Neither monitor touches the connection state machine; both only produce
//! alert messages for the session's owner to emit.

pub use motion::MotionMonitor;
pub use ptz::{ParsePtzError, PtzDirection, ptz_alert_message};

mod motion;
mod ptz;
