//! Session state types

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::playback::Epoch;

/// Lifecycle of a session's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No attempt made yet, or the session was disposed
    Idle,
    /// Attachment created, waiting for the manifest
    Connecting,
    /// Manifest (or native metadata) is usable
    Connected,
    /// Attempt gave up; stays here until an explicit retry
    Failed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Live,
    Historical,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Live => write!(f, "live"),
            PlaybackMode::Historical => write!(f, "historical"),
        }
    }
}

/// Recorded footage to play: a day and an hour range within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HistoricalWindow {
    date: NaiveDate,
    start_hour: u8,
    end_hour: u8,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("hour {hour} is outside 0..=24")]
    HourOutOfRange { hour: u8 },

    #[error("start hour {start} is after end hour {end}")]
    InvertedRange { start: u8, end: u8 },

    #[error("malformed hour range '{input}', expected START-END")]
    Malformed { input: String },
}

impl HistoricalWindow {
    pub const LAST_HOUR: u8 = 24;

    /// Creates a window, enforcing `start <= end` with both in `0..=24`.
    ///
    /// # Errors
    /// - `WindowError::HourOutOfRange` - Either hour exceeds 24
    /// - `WindowError::InvertedRange` - Start hour after end hour
    pub fn new(date: NaiveDate, start_hour: u8, end_hour: u8) -> Result<Self, WindowError> {
        for hour in [start_hour, end_hour] {
            if hour > Self::LAST_HOUR {
                return Err(WindowError::HourOutOfRange { hour });
            }
        }
        if start_hour > end_hour {
            return Err(WindowError::InvertedRange {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            date,
            start_hour,
            end_hour,
        })
    }

    /// Creates a window from a `START-END` hour range such as `9-17`.
    ///
    /// # Errors
    /// - `WindowError::Malformed` - Not two integers separated by `-`
    /// - See [`Self::new`] for range errors
    pub fn from_hour_range(date: NaiveDate, range: &str) -> Result<Self, WindowError> {
        let malformed = || WindowError::Malformed {
            input: range.to_string(),
        };
        let (start, end) = range.split_once('-').ok_or_else(malformed)?;
        let start = start.trim().parse::<u8>().map_err(|_| malformed())?;
        let end = end.trim().parse::<u8>().map_err(|_| malformed())?;
        Self::new(date, start, end)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    /// Human-readable form: `2024-03-05 09:00–17:00`.
    pub fn describe(&self) -> String {
        format!(
            "{} {:02}:00–{:02}:00",
            self.date.format("%Y-%m-%d"),
            self.start_hour,
            self.end_hour
        )
    }
}

/// Read-only view of a session for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub connection_state: ConnectionState,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub is_playing_intent: bool,
    pub mode: PlaybackMode,
    pub source_url: String,
    pub window: Option<HistoricalWindow>,
    pub epoch: Epoch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_fifth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_window_description_pads_hours() {
        let window = HistoricalWindow::new(march_fifth(), 9, 17).unwrap();
        assert_eq!(window.describe(), "2024-03-05 09:00–17:00");

        let whole_day = HistoricalWindow::new(march_fifth(), 0, 24).unwrap();
        assert_eq!(whole_day.describe(), "2024-03-05 00:00–24:00");
    }

    #[test]
    fn test_window_rejects_bad_ranges() {
        assert_eq!(
            HistoricalWindow::new(march_fifth(), 17, 9),
            Err(WindowError::InvertedRange { start: 17, end: 9 })
        );
        assert_eq!(
            HistoricalWindow::new(march_fifth(), 3, 25),
            Err(WindowError::HourOutOfRange { hour: 25 })
        );
        assert!(HistoricalWindow::new(march_fifth(), 12, 12).is_ok());
    }

    #[test]
    fn test_window_from_hour_range() {
        let window = HistoricalWindow::from_hour_range(march_fifth(), " 9 - 17 ").unwrap();
        assert_eq!((window.start_hour(), window.end_hour()), (9, 17));

        assert!(matches!(
            HistoricalWindow::from_hour_range(march_fifth(), "nine-five"),
            Err(WindowError::Malformed { .. })
        ));
        assert!(matches!(
            HistoricalWindow::from_hour_range(march_fifth(), "9"),
            Err(WindowError::Malformed { .. })
        ));
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert!(ConnectionState::Connected.is_connected());
        assert!(ConnectionState::Failed.is_failed());
    }
}
