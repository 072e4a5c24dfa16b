//! Command-line interface for operating the engine's durable state.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::history::HistoryArgs;
use commands::init::InitArgs;
use commands::stats::StatsArgs;

#[derive(Parser, Debug)]
#[command(
    name = "quillgate",
    about = "Adaptive quality-gated text generation engine",
    version
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the project-local .quillgate directory and database
    Init(InitArgs),
    /// Show learned per-(strategy, failure type) remediation statistics
    Stats(StatsArgs),
    /// Show the append-only attempt record log
    History(HistoryArgs),
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) {
    if json_mode {
        let payload = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
