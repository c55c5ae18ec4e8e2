//! Pan/tilt/zoom commands.
//!
//! Commands have no network effect; an enabled camera acknowledges them
//! with an informational alert.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::CameraSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PtzDirection {
    Up,
    Down,
    Left,
    Right,
    ZoomIn,
    ZoomOut,
    Home,
}

impl PtzDirection {
    pub const ALL: [PtzDirection; 7] = [
        PtzDirection::Up,
        PtzDirection::Down,
        PtzDirection::Left,
        PtzDirection::Right,
        PtzDirection::ZoomIn,
        PtzDirection::ZoomOut,
        PtzDirection::Home,
    ];

    /// Action name used in alerts and on the command line.
    pub fn action(self) -> &'static str {
        match self {
            PtzDirection::Up => "up",
            PtzDirection::Down => "down",
            PtzDirection::Left => "left",
            PtzDirection::Right => "right",
            PtzDirection::ZoomIn => "zoom-in",
            PtzDirection::ZoomOut => "zoom-out",
            PtzDirection::Home => "home",
        }
    }
}

impl fmt::Display for PtzDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown PTZ direction '{input}'")]
pub struct ParsePtzError {
    pub input: String,
}

impl FromStr for PtzDirection {
    type Err = ParsePtzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|direction| direction.action() == wanted)
            .ok_or_else(|| ParsePtzError {
                input: s.to_string(),
            })
    }
}

/// Alert text for a PTZ command, or None when the camera has PTZ disabled.
pub fn ptz_alert_message(settings: &CameraSettings, direction: PtzDirection) -> Option<String> {
    settings
        .ptz
        .then(|| format!("PTZ: {} on {}", direction.action(), settings.title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_separators() {
        assert_eq!("zoom-in".parse(), Ok(PtzDirection::ZoomIn));
        assert_eq!(" ZOOM_OUT ".parse(), Ok(PtzDirection::ZoomOut));
        assert_eq!("home".parse(), Ok(PtzDirection::Home));
        assert!("sideways".parse::<PtzDirection>().is_err());
    }

    #[test]
    fn test_alert_requires_ptz_enabled() {
        let mut settings = CameraSettings::with_stream("Gate", "https://cams.example.com/gate.m3u8");
        assert_eq!(ptz_alert_message(&settings, PtzDirection::Left), None);

        settings.ptz = true;
        assert_eq!(
            ptz_alert_message(&settings, PtzDirection::Left).as_deref(),
            Some("PTZ: left on Gate")
        );
    }
}
