//! netune - Mirror a NetEase Cloud Music playlist to a local music folder

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod lyrics;
mod metadata;
mod netease;
mod sync;
mod utils;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completion { shell } = cli.command {
        cli::commands::completion(shell);
        return Ok(());
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    // Initialize logging
    let filter = if cli.verbose {
        "netune=debug".to_string()
    } else {
        format!("netune={}", config.log.level)
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Sync { dry_run, limit } => {
            cli::commands::sync(config, dry_run, limit).await?;
        }
        Commands::Status => {
            cli::commands::status(config)?;
        }
        Commands::Logout => {
            cli::commands::logout(config)?;
        }
        Commands::Completion { .. } => {}
    }

    Ok(())
}
