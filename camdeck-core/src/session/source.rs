//! Stream URL validation.

use thiserror::Error;
use url::Url;

/// Why a stream URL was refused before any connection attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlRejection {
    #[error("stream URL is empty")]
    Empty,

    #[error("stream URL is malformed: {reason}")]
    Malformed { reason: String },

    #[error("stream URL scheme '{scheme}' is not http or https")]
    UnsupportedScheme { scheme: String },
}

/// Trims `raw` and checks that it is an absolute http(s) URL.
///
/// Returns the trimmed input unchanged (not the normalized URL) so the
/// streaming client sees exactly what was configured.
///
/// # Errors
/// - `UrlRejection::Empty` - Nothing left after trimming
/// - `UrlRejection::Malformed` - Not an absolute URL
/// - `UrlRejection::UnsupportedScheme` - Scheme other than http/https
pub fn validate_stream_url(raw: &str) -> Result<&str, UrlRejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlRejection::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlRejection::Malformed {
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed),
        other => Err(UrlRejection::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert_eq!(
            validate_stream_url("  https://cams.example.com/lobby/index.m3u8 \n"),
            Ok("https://cams.example.com/lobby/index.m3u8")
        );
        assert!(validate_stream_url("http://10.0.0.12:8080/live.m3u8").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_relative() {
        assert_eq!(validate_stream_url("   "), Err(UrlRejection::Empty));
        assert!(matches!(
            validate_stream_url("/streams/lobby.m3u8"),
            Err(UrlRejection::Malformed { .. })
        ));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(
            validate_stream_url("rtsp://10.0.0.12/stream1"),
            Err(UrlRejection::UnsupportedScheme {
                scheme: "rtsp".to_string()
            })
        );
        assert!(validate_stream_url("httpx://example.com/a.m3u8").is_err());
    }
}
