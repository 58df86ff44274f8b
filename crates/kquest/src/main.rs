//! KubeQuest - learn Kubernetes by fixing broken clusters.
//!
//! CLI entry point for the game engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use kquest::{commands, config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kquest")]
#[command(about = "KubeQuest - learn Kubernetes by fixing broken clusters", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the worlds content directory
    #[arg(long, global = true)]
    worlds_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the campaign (default)
    Play,

    /// Show per-world completion
    Progress,

    /// Reset player progress
    Reset {
        /// Delete the record and journal instead of zeroing them
        #[arg(long)]
        hard: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the game screen;
    // default to warnings, RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = config::load(&cli.config)?;
    if let Some(worlds_dir) = cli.worlds_dir {
        config.game.worlds_dir = worlds_dir;
    }

    match cli.command.unwrap_or(Commands::Play) {
        Commands::Play => commands::play::run(config).await,
        Commands::Progress => commands::progress::run(&config),
        Commands::Reset { hard } => commands::reset::run(&config, hard),
    }
}
