//! Integration tests for camdeck
//!
//! Session actors driven over the simulated playback stack, property tests
//! of the session state machine, and the camera wall.

#[path = "style.rs"]
mod style;

#[path = "integration/camera_wall.rs"]
mod camera_wall;
#[path = "integration/session_lifecycle.rs"]
mod session_lifecycle;
#[path = "integration/session_properties.rs"]
mod session_properties;
