//! Quillgate CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quillgate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => quillgate::cli::commands::init::execute(args, cli.json).await,
        Commands::Stats(args) => quillgate::cli::commands::stats::execute(args, cli.json).await,
        Commands::History(args) => quillgate::cli::commands::history::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        quillgate::cli::handle_error(err, cli.json);
    }
}
