//! teachable - teach classes by example and classify embeddings from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ClassifyCommand, StatsCommand, WatchCommand};

/// teachable - online k-nearest-neighbour classification of embeddings.
///
/// Embeddings are read from JSON Lines files, one record per line:
///   examples: {"label": "HAPPY", "embedding": [0.1, 0.7, ...]}
///   queries:  {"id": "frame-1", "embedding": [0.2, 0.6, ...]}
///
/// The embeddings stand in for a feature extractor's raw output and are
/// normalized before use.
#[derive(Parser)]
#[command(name = "teachable")]
#[command(about = "Teach classes by example and classify embeddings")]
#[command(version)]
pub struct Cli {
    /// Session config file (YAML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of neighbours (clamped to the configured range)
    #[arg(short = 'k', long, global = true)]
    pub k: Option<usize>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Teach the examples, then classify every query
    Classify(ClassifyCommand),
    /// Teach the examples and report what the store holds
    Stats(StatsCommand),
    /// Teach the examples, then classify queries on the configured interval
    Watch(WatchCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Classify(cmd) => cmd.run(&cli).await,
        Commands::Stats(cmd) => cmd.run(&cli).await,
        Commands::Watch(cmd) => cmd.run(&cli).await,
    }
}
