//! R-Droid Sync - command line front end
//!
//! Runs a Gradle project sync against a build fixture and prints the
//! delivered models as JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use r_droid_core::{APP_NAME, VERSION};
use r_droid_sync::commands::{render, SyncCommand, SyncMode};
use r_droid_gradle_sync::DeliveredModel;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Syncs a build fixture and prints the delivered models
    Sync {
        /// JSON description of the build
        fixture: PathBuf,
        /// Sync mode, ignored when an options file is given
        #[arg(long, value_enum, default_value_t = SyncMode::Single)]
        mode: SyncMode,
        /// JSON file with the full sync options
        #[arg(long)]
        options: Option<PathBuf>,
        /// TOML configuration file
        #[arg(long, env = "RDROID_SYNC_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} starting...", APP_NAME, VERSION);

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync { fixture, mode, options, config } => {
            let command = SyncCommand { fixture_path: fixture, mode, options_path: options, config_path: config };
            let deliveries = command.execute().await?;
            println!("{}", render(&deliveries)?);

            if deliveries.iter().any(|d| matches!(d.model, DeliveredModel::SyncError(_))) {
                error!("Sync finished with an error");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
