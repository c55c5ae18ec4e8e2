//! Camdeck CLI - Command-line interface
//!
//! Drives camera sessions against the simulated playback stack and inspects
//! camera settings, stream URLs and the mock event feed.

mod commands;

use std::path::PathBuf;

use camdeck_core::tracing_setup::{CliLogLevel, init_tracing};
use clap::Parser;

#[derive(Parser)]
#[command(name = "camdeck")]
#[command(about = "Camera dashboard playback core")]
struct Cli {
    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the full trace of the last run
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let trace_file = init_tracing(cli.log_level.into(), cli.logs_dir.as_deref())?;
    tracing::debug!("Full trace written to {}", trace_file.display());

    commands::handle_command(cli.command).await
}
