//! CLI command implementations

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use camdeck_core::engine::spawn_session;
use camdeck_core::feed::{EventFeed, EventKind};
use camdeck_core::session::validate_stream_url;
use camdeck_core::{
    Alert, AlertIds, AlertLevel, CamdeckConfig, CamdeckError, CameraSettings, ConnectionState,
    HistoricalWindow, PlaybackMode, SessionSnapshot,
};
use camdeck_sim::{SimulatedBackend, SimulatedSink, SimulationConfig};
use chrono::{NaiveDate, TimeDelta, Utc};
use clap::{Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast;
use tokio::time;

/// Camera id used for the single session the CLI drives.
const CLI_CAMERA_ID: u64 = 1;
/// Sink id of the simulated video element.
const CLI_SINK_ID: u64 = 1;
const SNAPSHOT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch a camera session play against the simulated backend
    Watch {
        /// Manifest URL (overrides the settings file)
        url: Option<String>,
        /// Camera settings JSON file
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Live stream or recorded footage
        #[arg(long, value_enum, default_value_t = ModeArg::Live)]
        mode: ModeArg,
        /// Recording day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Recording hour range
        #[arg(long, default_value = "0-24")]
        hours: String,
        /// How long to watch
        #[arg(short, long, default_value = "5")]
        duration_secs: u64,
        /// Probability that a manifest load fails fatally
        #[arg(long, default_value = "0.0")]
        fail_rate: f64,
        /// Seed for the simulated backend
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Simulated manifest latency
        #[arg(long, default_value = "150")]
        latency_ms: u64,
        /// Play through the sink instead of a streaming client
        #[arg(long)]
        native: bool,
        /// Pretend adaptive streaming is unavailable
        #[arg(long)]
        unsupported: bool,
        /// Reject the first play request
        #[arg(long)]
        autoplay_blocked: bool,
        /// Enable simulated motion detection
        #[arg(long)]
        motion: bool,
    },
    /// Print the mock event feed
    Events {
        /// Camera the events belong to
        #[arg(short, long, default_value = "1")]
        camera: u64,
        /// Number of events
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
        /// Only show one kind of event
        #[arg(short, long)]
        kind: Option<EventKind>,
        /// Fixed seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
        /// Look-back period in hours
        #[arg(long, default_value = "24")]
        hours: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check whether a stream URL would be accepted
    CheckUrl {
        /// Manifest URL
        url: String,
    },
    /// Validate a camera settings file and print it with defaults filled in
    Settings {
        /// Camera settings JSON file
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Live,
    Historical,
}

impl From<ModeArg> for PlaybackMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Live => PlaybackMode::Live,
            ModeArg::Historical => PlaybackMode::Historical,
        }
    }
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", PlaybackMode::from(*self))
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command that ran, with a user-facing message
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Watch {
            url,
            settings,
            mode,
            date,
            hours,
            duration_secs,
            fail_rate,
            seed,
            latency_ms,
            native,
            unsupported,
            autoplay_blocked,
            motion,
        } => {
            let mut camera = load_camera(url, settings.as_deref())?;
            camera.motion_detection |= motion;

            let window = match mode {
                ModeArg::Live => None,
                ModeArg::Historical => {
                    let date = date.unwrap_or_else(|| Utc::now().date_naive());
                    Some(HistoricalWindow::from_hour_range(date, &hours).map_err(user_facing)?)
                }
            };

            let simulation = SimulationConfig {
                seed,
                manifest_latency: Duration::from_millis(latency_ms),
                fatal_error_rate: fail_rate,
                supported: !unsupported,
                native_playback: native,
                autoplay_blocked,
                ..SimulationConfig::default()
            };
            simulation.validate()?;

            watch(camera, window, simulation, Duration::from_secs(duration_secs)).await
        }
        Commands::Events {
            camera,
            count,
            kind,
            seed,
            hours,
            json,
        } => show_events(camera, count, kind, seed, hours, json),
        Commands::CheckUrl { url } => check_url(&url),
        Commands::Settings { path } => show_settings(&path),
    }
}

/// Runs one session until `duration` elapses or the session fails.
///
/// # Errors
/// - `SessionError::ActorShutdown` - Session actor stopped unexpectedly
pub async fn watch(
    camera: CameraSettings,
    window: Option<HistoricalWindow>,
    simulation: SimulationConfig,
    duration: Duration,
) -> anyhow::Result<()> {
    let config = CamdeckConfig::from_env();
    let title = camera.title.clone();

    let handle = spawn_session(
        CLI_CAMERA_ID,
        camera,
        &config,
        Box::new(SimulatedBackend::new(simulation.clone())),
        Box::new(SimulatedSink::new(CLI_SINK_ID, simulation)),
        AlertIds::new(),
    );
    let mut alerts = handle.subscribe_alerts().await?;

    println!("Watching '{title}' for {}s", duration.as_secs());
    let mut last = match window {
        Some(window) => handle.open_recording(window).await?,
        None => handle.open_live().await?,
    };
    print_snapshot(&last);

    let deadline = time::sleep(duration);
    tokio::pin!(deadline);
    let mut poll = time::interval(SNAPSHOT_POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            received = alerts.recv() => match received {
                Ok(alert) => print_alert(&alert),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {} alerts", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = poll.tick() => {
                let snapshot = handle.snapshot().await?;
                if snapshot.connection_state != last.connection_state
                    || snapshot.retry_count != last.retry_count
                {
                    print_snapshot(&snapshot);
                }
                let failed = snapshot.connection_state == ConnectionState::Failed;
                last = snapshot;
                if failed {
                    break;
                }
            }
        }
    }

    handle.shutdown().await?;
    while let Ok(alert) = alerts.try_recv() {
        print_alert(&alert);
    }
    println!("{}", summary(&last));
    Ok(())
}

fn summary(snapshot: &SessionSnapshot) -> String {
    match &snapshot.last_error {
        Some(error) => format!(
            "Finished {} ({} mode), last error: {error}",
            snapshot.connection_state, snapshot.mode
        ),
        None => format!(
            "Finished {} ({} mode)",
            snapshot.connection_state, snapshot.mode
        ),
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    let retries = if snapshot.retry_count > 0 {
        format!(" (retry {})", snapshot.retry_count)
    } else {
        String::new()
    };
    println!(
        "  [{}] {}{} {}",
        snapshot.mode, snapshot.connection_state, retries, snapshot.source_url
    );
}

fn print_alert(alert: &Alert) {
    let marker = match alert.level {
        AlertLevel::Info => "i",
        AlertLevel::Warning => "!",
        AlertLevel::Error => "x",
    };
    println!(
        "  {marker} {} {} {}",
        alert.created_at.format("%H:%M:%S"),
        alert.id,
        alert.message
    );
}

/// Print the mock event feed
///
/// # Errors
/// - `serde_json::Error` - JSON output failed
pub fn show_events(
    camera: u64,
    count: usize,
    kind: Option<EventKind>,
    seed: Option<u64>,
    hours: i64,
    json: bool,
) -> anyhow::Result<()> {
    let lookback = lookback_hours(hours).map_err(user_facing)?;

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    };
    let feed = EventFeed::generate(&mut rng, camera, count, Utc::now(), lookback);
    let events: Vec<_> = match kind {
        Some(kind) => feed.filter_kind(kind).collect(),
        None => feed.events().iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events");
        return Ok(());
    }
    for event in events {
        println!(
            "{}  {:<8} {:>3.0}%  camera {}  {}",
            event.occurred_at.format("%Y-%m-%d %H:%M:%S"),
            event.kind.to_string(),
            event.confidence * 100.0,
            event.camera_id,
            event.description
        );
    }
    Ok(())
}

/// Check a stream URL
///
/// # Errors
/// - Rejection reason when the URL would not be opened
pub fn check_url(url: &str) -> anyhow::Result<()> {
    match validate_stream_url(url) {
        Ok(valid) => {
            println!("OK: {valid}");
            Ok(())
        }
        Err(rejection) => Err(anyhow!("Rejected: {rejection}")),
    }
}

/// Validate and print a camera settings file
///
/// # Errors
/// - `SettingsError` - File unreadable, not JSON or out of range
pub fn show_settings(path: &Path) -> anyhow::Result<()> {
    let settings = CameraSettings::load(path).map_err(user_facing)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn load_camera(url: Option<String>, settings: Option<&Path>) -> anyhow::Result<CameraSettings> {
    let mut camera = match settings {
        Some(path) => CameraSettings::load(path)
            .map_err(user_facing)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CameraSettings::default(),
    };
    if let Some(url) = url {
        camera.data_source.stream_url = url;
    }
    if camera.live_url().is_empty() {
        bail!("No stream URL given: pass one or use --settings");
    }
    Ok(camera)
}

/// Longest accepted look-back, one hundred years.
const MAX_LOOKBACK_HOURS: i64 = 100 * 366 * 24;

fn lookback_hours(hours: i64) -> Result<TimeDelta, CamdeckError> {
    if !(1..=MAX_LOOKBACK_HOURS).contains(&hours) {
        return Err(CamdeckError::Configuration {
            reason: format!("look-back must be between 1 and {MAX_LOOKBACK_HOURS} hours, got {hours}"),
        });
    }
    TimeDelta::try_hours(hours).ok_or_else(|| CamdeckError::Configuration {
        reason: format!("look-back of {hours} hours is out of range"),
    })
}

/// Input mistakes print the cause, other failures only the summary.
fn user_facing(error: impl Into<CamdeckError>) -> anyhow::Error {
    let error = error.into();
    if error.is_user_error() {
        anyhow!("{}: {}", error.user_message(), error)
    } else {
        tracing::debug!("Command failed: {:?}", error);
        anyhow!("{}", error.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback_within_range() {
        assert_eq!(lookback_hours(24).unwrap(), TimeDelta::hours(24));
        assert!(lookback_hours(MAX_LOOKBACK_HOURS).is_ok());
    }

    #[test]
    fn test_extreme_lookback_is_rejected() {
        for hours in [0, -5, MAX_LOOKBACK_HOURS + 1, 2_000_000_000_000, i64::MAX] {
            let error = lookback_hours(hours).unwrap_err();
            assert!(error.is_user_error());
            assert!(matches!(error, CamdeckError::Configuration { .. }));
        }
    }

    #[test]
    fn test_show_events_rejects_extreme_lookback() {
        let result = show_events(1, 5, None, Some(1), 2_000_000_000_000, true);

        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("Invalid configuration"));
    }
}
