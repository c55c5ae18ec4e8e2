//! Tracing setup for camdeck
//!
//! Console output at the level the user picked, plus a full trace of the
//! last run on disk so session transitions can be replayed after the fact.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Name of the per-run trace file inside the logs directory.
pub const LAST_RUN_LOG: &str = "camdeck-last-run.log";

/// Crates whose events follow the chosen level. Everything else stays at warn.
const CAMDECK_TARGETS: [&str; 3] = ["camdeck", "camdeck_core", "camdeck_sim"];

/// Installs the global subscriber and returns the trace file path.
///
/// `RUST_LOG` replaces the console directives entirely. The file at
/// `logs_dir/camdeck-last-run.log` (default `./logs`) is truncated on
/// every run and records camdeck crates at TRACE.
///
/// # Errors
///
/// - `std::io::Error` - If the logs directory or log file cannot be created
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let (log_file_path, log_file) = open_last_run_log(logs_dir.unwrap_or(Path::new("logs")))?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(camdeck_directives(console_level)));

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(camdeck_directives(Level::TRACE)));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(
        console = %console_level,
        trace_file = %log_file_path.display(),
        "Tracing initialized"
    );

    Ok(log_file_path)
}

/// Filter directives that put every camdeck crate at `level`.
fn camdeck_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(CAMDECK_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

fn open_last_run_log(logs_dir: &Path) -> std::io::Result<(PathBuf, File)> {
    fs::create_dir_all(logs_dir)?;
    let path = logs_dir.join(LAST_RUN_LOG);
    let file = File::create(&path)?;
    Ok((path, file))
}

/// Console verbosity selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Swallowed teardown and playback failures
    Warn,
    /// Connection changes and alerts
    Info,
    /// Session transitions and discarded callbacks
    Debug,
    /// Everything, including every playback event
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}
