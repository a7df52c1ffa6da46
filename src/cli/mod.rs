//! CLI module for netune

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod session;

#[derive(Parser, Debug)]
#[command(name = "netune", about = "Mirror a NetEase Cloud Music playlist to a local folder")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true, env = "NETUNE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download new playlist tracks into the music folder
    Sync {
        /// Show which tracks would be downloaded without downloading
        #[arg(long)]
        dry_run: bool,

        /// Maximum tracks to process this run (overrides sync.download_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show ledger size, stored session, and configured paths
    Status,

    /// Forget the stored session cookie
    Logout,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
