//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::session::{self, SessionStore};
use crate::config::Config;
use crate::netease::{MusicApi, NeteaseClient};
use crate::sync::{DownloadQueue, QueueEvent, QueueReport, SyncLedger};

/// Handle the `sync` command
pub async fn sync(config: Config, dry_run: bool, limit: Option<usize>) -> Result<()> {
    config.ensure_dirs().await?;

    let client = NeteaseClient::new(&config.api.endpoint, config.api.request_timeout())?;
    let store = SessionStore::new(&config.paths.data_dir);

    println!("{}", "Signing in...".cyan());
    let session = session::establish(&client, &store, &config).await?;

    let remote = client
        .playlist_track_ids(&session, config.account.playlist_id)
        .await
        .context("Failed to fetch playlist")?;

    let mut ledger = SyncLedger::load(&config.paths.data_dir)?;
    let candidates = ledger.diff(&remote);

    println!(
        "Playlist has {} tracks, {} not yet synced",
        remote.len(),
        candidates.len().to_string().bold()
    );

    if candidates.is_empty() {
        println!("{}", "Already up to date.".green());
        return Ok(());
    }

    if dry_run {
        println!();
        println!("{}", "[DRY RUN] Would process:".yellow());
        for id in &candidates {
            println!("  {}", id);
        }
        return Ok(());
    }

    let mut queue_config = config.queue_config();
    if let Some(limit) = limit {
        queue_config.download_limit = limit;
    }

    let (tx, rx) = mpsc::channel(64);
    let progress = tokio::spawn(render_progress(rx));

    let api: Arc<dyn MusicApi> = Arc::new(client);
    let report = DownloadQueue::new(api, queue_config)
        .with_events(tx)
        .run(&session, candidates)
        .await;

    progress.await.context("Progress display task panicked")?;

    let added = ledger
        .commit(&report.synced)
        .context("Failed to update sync ledger")?;
    tracing::debug!("Ledger gained {} IDs", added);

    print_summary(&report);
    Ok(())
}

/// Drive a progress bar from queue events until the queue hangs up
async fn render_progress(mut rx: mpsc::Receiver<QueueEvent>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    while let Some(event) = rx.recv().await {
        match event {
            QueueEvent::Started { quota, .. } => bar.set_length(quota as u64),
            QueueEvent::Attempt { id, attempt } if attempt > 1 => {
                bar.set_message(format!("{} (attempt {})", id, attempt));
            }
            QueueEvent::Attempt { id, .. } => bar.set_message(id.to_string()),
            QueueEvent::Synced { path, .. } => {
                bar.inc(1);
                if let Some(name) = path.file_name() {
                    bar.println(format!("  {} {}", "✓".green(), name.to_string_lossy()));
                }
            }
            QueueEvent::Skipped { id, reason } => {
                bar.inc(1);
                bar.println(format!("  {} {} ({})", "skipped".yellow(), id, reason));
            }
            QueueEvent::Failed {
                id,
                attempt,
                message,
            } => {
                bar.println(format!(
                    "  {} {} attempt {}: {}",
                    "failed".red(),
                    id,
                    attempt,
                    message
                ));
            }
            QueueEvent::Dropped { id } => {
                bar.println(format!("  {} {}, giving up for this run", "dropped".red().bold(), id));
            }
            QueueEvent::Finished { .. } => bar.finish_and_clear(),
        }
    }
}

fn print_summary(report: &QueueReport) {
    println!();
    let headline = format!(
        "{} of {} synced, {} pending",
        report.synced.len(),
        report.candidates,
        report.unsynced()
    );
    if report.dropped.is_empty() {
        println!("{}", headline.green().bold());
    } else {
        println!("{}", headline.yellow().bold());
    }

    if !report.skipped.is_empty() {
        println!("  Skipped (recorded, not downloaded): {}", report.skipped.len());
    }
    if !report.dropped.is_empty() {
        let ids: Vec<String> = report.dropped.iter().map(ToString::to_string).collect();
        println!("  Gave up on: {}", ids.join(", "));
    }
}

/// Handle the `status` command
pub fn status(config: Config) -> Result<()> {
    let ledger_path = SyncLedger::file_in(&config.paths.data_dir);
    let store = SessionStore::new(&config.paths.data_dir);

    println!("{} {}", "Playlist:".bold(), config.account.playlist_id);
    println!("  Gateway: {}", config.api.endpoint);

    if ledger_path.exists() {
        let ledger = SyncLedger::load(&config.paths.data_dir)?;
        println!("  Synced tracks: {} ({})", ledger.len(), ledger.path().display());
        if let Some(latest) = ledger.synced().first() {
            println!("  Most recent: {}", latest);
        }
    } else {
        println!("  {}", "No sync history yet.".yellow());
    }

    let has_session = store.path().exists()
        && std::fs::metadata(store.path()).is_ok_and(|m| m.len() > 0);
    if has_session {
        println!("  Session: {}", "stored".green());
    } else {
        println!("  Session: {}", "none".yellow());
    }

    println!();
    println!("{}", "Paths:".bold());
    println!("  Music:  {}", config.paths.music_dir.display());
    println!("  Temp:   {}", config.paths.temp_dir.display());
    println!("  Covers: {}", config.paths.cover_dir.display());
    println!("  Data:   {}", config.paths.data_dir.display());

    Ok(())
}

/// Handle the `logout` command
pub fn logout(config: Config) -> Result<()> {
    SessionStore::new(&config.paths.data_dir).clear()?;
    println!("{}", "Stored session cleared.".green());
    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "netune", &mut io::stdout());
}
