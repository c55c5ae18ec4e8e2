//! Camera settings handed to a session by the dashboard.
//!
//! Only the data source reaches the stream session. Motion and PTZ flags
//! drive the monitors next to it; everything else is carried for the
//! rendering layer untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CameraId = u64;

/// Highest accepted motion sensitivity.
pub const MAX_MOTION_SENSITIVITY: u8 = 100;

/// Settings for one camera slot.
///
/// Deserializes from the dashboard's camelCase JSON; every missing field
/// falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraSettings {
    pub title: String,
    pub data_source: DataSource,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "refreshInterval")]
    pub refresh_interval_secs: u64,
    pub motion_detection: bool,
    pub motion_sensitivity: u8,
    pub notifications: bool,
    pub recording_enabled: bool,
    #[serde(rename = "storageRetention")]
    pub storage_retention_days: u32,
    pub ptz: bool,
}

/// Where the camera's manifests live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSource {
    /// Live manifest URL
    pub stream_url: String,
    /// Recorded-footage manifest URL; the live URL is used when absent
    pub playback_url: Option<String>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            title: "Camera".to_string(),
            data_source: DataSource::default(),
            username: None,
            password: None,
            refresh_interval_secs: 30,
            motion_detection: false,
            motion_sensitivity: 50,
            notifications: true,
            recording_enabled: false,
            storage_retention_days: 30,
            ptz: false,
        }
    }
}

/// Errors raised while loading camera settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {reason}")]
    Invalid { reason: String },
}

impl CameraSettings {
    /// Creates settings for a live stream with everything else defaulted.
    pub fn with_stream(title: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data_source: DataSource {
                stream_url: stream_url.into(),
                playback_url: None,
            },
            ..Self::default()
        }
    }

    /// Parses and validates settings from JSON.
    ///
    /// # Errors
    /// - `SettingsError::Parse` - Input is not valid settings JSON
    /// - `SettingsError::Invalid` - A field is out of range
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a JSON file.
    ///
    /// # Errors
    /// - `SettingsError::Io` - File cannot be read
    /// - `SettingsError::Parse` / `SettingsError::Invalid` - See [`Self::from_json`]
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Checks field ranges that serde cannot express.
    ///
    /// # Errors
    /// - `SettingsError::Invalid` - Sensitivity above 100 or empty title
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.motion_sensitivity > MAX_MOTION_SENSITIVITY {
            return Err(SettingsError::Invalid {
                reason: format!(
                    "motion sensitivity {} exceeds {MAX_MOTION_SENSITIVITY}",
                    self.motion_sensitivity
                ),
            });
        }
        if self.title.trim().is_empty() {
            return Err(SettingsError::Invalid {
                reason: "title must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// URL opened for live viewing.
    pub fn live_url(&self) -> &str {
        &self.data_source.stream_url
    }

    /// URL opened for recorded footage.
    pub fn playback_url(&self) -> &str {
        self.data_source
            .playback_url
            .as_deref()
            .unwrap_or(&self.data_source.stream_url)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings =
            CameraSettings::from_json(r#"{"dataSource": {"streamUrl": "https://cam/live.m3u8"}}"#)
                .unwrap();

        assert_eq!(settings.title, "Camera");
        assert_eq!(settings.live_url(), "https://cam/live.m3u8");
        assert_eq!(settings.playback_url(), "https://cam/live.m3u8");
        assert_eq!(settings.refresh_interval_secs, 30);
        assert!(!settings.ptz);
    }

    #[test]
    fn test_settings_dashboard_field_names() {
        let raw = r#"{
            "title": "Loading dock",
            "dataSource": {"streamUrl": "https://cam/live.m3u8", "playbackUrl": "https://cam/vod.m3u8"},
            "refreshInterval": 5,
            "motionDetection": true,
            "motionSensitivity": 80,
            "storageRetention": 14,
            "ptz": true
        }"#;
        let settings = CameraSettings::from_json(raw).unwrap();

        assert_eq!(settings.title, "Loading dock");
        assert_eq!(settings.playback_url(), "https://cam/vod.m3u8");
        assert_eq!(settings.refresh_interval_secs, 5);
        assert_eq!(settings.storage_retention_days, 14);
        assert_eq!(settings.motion_sensitivity, 80);
        assert!(settings.motion_detection);
        assert!(settings.ptz);
    }

    #[test]
    fn test_settings_rejects_sensitivity_out_of_range() {
        let result = CameraSettings::from_json(r#"{"motionSensitivity": 150}"#);
        assert!(matches!(result, Err(SettingsError::Invalid { .. })));
    }

    #[test]
    fn test_settings_rejects_malformed_json() {
        let result = CameraSettings::from_json("{not json");
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_settings_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"title": "Gate", "ptz": true}}"#).unwrap();

        let settings = CameraSettings::load(file.path()).unwrap();
        assert_eq!(settings.title, "Gate");
        assert!(settings.ptz);

        let missing = CameraSettings::load(Path::new("/nonexistent/camdeck.json"));
        assert!(matches!(missing, Err(SettingsError::Io { .. })));
    }
}
