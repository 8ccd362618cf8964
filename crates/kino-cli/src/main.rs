//! Kino CLI - Playback Event Normalization Toolkit
//!
//! Features:
//! - Deterministic replay of recorded raw media event traces
//! - Live normalization of raw events read from stdin
//! - Raw event vocabulary listing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Kino CLI - Playback event normalization toolkit
#[derive(Parser)]
#[command(name = "kino-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Replay and watch normalized media playback events", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Override the buffering debounce window in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded raw event trace (.json, or one step per line)
    Replay {
        /// Path to the trace file
        trace: PathBuf,

        /// Print the final playback state
        #[arg(short, long)]
        state: bool,
    },

    /// Normalize raw events typed on stdin in real time.
    ///
    /// Each line is a raw event name (`playing`, `ratechange`, ...), an
    /// attribute change (`rate 0`, `paused true`, `seeking false`) or a pause
    /// in input (`advance 100`). Attributes are read live, as from a real
    /// engine.
    Watch,

    /// List the raw event vocabulary
    Events,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for events
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    kino_playback::init();

    match cli.command {
        Commands::Replay { trace, state } => {
            commands::replay(&trace, state, cli.debounce_ms, &cli.format)?;
        }
        Commands::Watch => {
            commands::watch(cli.debounce_ms, &cli.format).await?;
        }
        Commands::Events => {
            commands::events(&cli.format);
        }
    }

    Ok(())
}
