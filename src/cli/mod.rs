use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Message Stream Traffic History Analyser
#[derive(Parser)]
#[command(name = "traffic-history")]
#[command(about = "Reconstruct publish rates and throughput from the messages retained in limit-retention streams")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print a summary and rate histograms for the selected streams
    Report(commands::report::ReportCommand),
    /// List limits-retention streams and their reported bounds
    Streams(commands::streams::StreamsCommand),
    /// Build the histogram once and serve it over a JSON query API
    Serve(commands::serve::ServeCommand),
    /// Zoom through the histogram interactively on stdin
    Explore(commands::explore::ExploreCommand),
}

pub async fn run() -> AppResult<()> {
    // Uses RUST_LOG environment variable (defaults to "warn" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report(command) => command.run().await,
        Commands::Streams(command) => command.run().await,
        Commands::Serve(command) => command.run().await,
        Commands::Explore(command) => command.run().await,
    }
}
