//! The retrying download queue
//!
//! Candidates are popped from the end of the pending list one at a time. A
//! failed candidate goes back on the end, so it is retried next. Each
//! iteration that processes a candidate is followed by one pause.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::pipeline::{LyricOptions, SkipReason, TrackOutcome, TrackPipeline};
use super::storage::LibraryStorage;
use crate::config::RetryScope;
use crate::netease::{MusicApi, Session, TrackId};

/// Settings for one queue run
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub download_limit: usize,
    /// Pause after each processed candidate
    pub delay: Duration,
    pub retry_limit: u32,
    pub retry_scope: RetryScope,
    pub bitrate: u32,
    pub download_lyrics: bool,
    pub download_translation: bool,
    pub filename_template: String,
    pub temp_dir: PathBuf,
    pub cover_dir: PathBuf,
    pub music_dir: PathBuf,
}

/// Progress updates sent during a run
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Started {
        candidates: usize,
        quota: usize,
    },
    Attempt {
        id: TrackId,
        attempt: u32,
    },
    Synced {
        id: TrackId,
        path: PathBuf,
    },
    Skipped {
        id: TrackId,
        reason: SkipReason,
    },
    /// A failed attempt; the candidate was requeued
    Failed {
        id: TrackId,
        attempt: u32,
        message: String,
    },
    /// The candidate ran out of retries
    Dropped {
        id: TrackId,
    },
    Finished {
        synced: usize,
        pending: usize,
    },
}

/// Result of a queue run
#[derive(Debug, Clone, Default)]
pub struct QueueReport {
    pub candidates: usize,
    /// Newly recorded IDs, most recent first, skips included
    pub synced: Vec<TrackId>,
    pub skipped: Vec<(TrackId, SkipReason)>,
    pub dropped: Vec<TrackId>,
    /// Candidates left unprocessed when the quota ran out
    pub pending: Vec<TrackId>,
    pub iterations: usize,
    pub pauses: usize,
}

impl QueueReport {
    /// Candidates that will show up again in the next diff
    pub fn unsynced(&self) -> usize {
        self.candidates - self.synced.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: TrackId,
    /// Attempts made so far, including the current one once started
    attempts: u32,
}

pub struct DownloadQueue {
    pipeline: TrackPipeline,
    config: QueueConfig,
    events: Option<mpsc::Sender<QueueEvent>>,
}

impl DownloadQueue {
    pub fn new(api: Arc<dyn MusicApi>, config: QueueConfig) -> Self {
        let storage = LibraryStorage::new(
            config.temp_dir.clone(),
            config.cover_dir.clone(),
            config.music_dir.clone(),
            config.filename_template.clone(),
        );
        let lyrics = LyricOptions {
            enabled: config.download_lyrics,
            translation: config.download_translation,
        };
        Self {
            pipeline: TrackPipeline::new(api, storage, config.bitrate, lyrics),
            config,
            events: None,
        }
    }

    /// Report progress to `tx` while running
    pub fn with_events(mut self, tx: mpsc::Sender<QueueEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Drain `candidates` until the quota is used up or nothing is left
    pub async fn run(&self, session: &Session, candidates: Vec<TrackId>) -> QueueReport {
        let mut report = QueueReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        let mut pending: Vec<Candidate> = candidates
            .into_iter()
            .map(|id| Candidate { id, attempts: 0 })
            .collect();
        let mut quota = self.config.download_limit.min(pending.len());
        let mut run_failures = 0u32;

        info!(
            "Processing up to {} of {} candidates",
            quota,
            pending.len()
        );
        self.emit(QueueEvent::Started {
            candidates: pending.len(),
            quota,
        })
        .await;

        while quota > 0 && !pending.is_empty() {
            if self.config.retry_scope == RetryScope::Run
                && run_failures >= self.config.retry_limit
            {
                if let Some(dropped) = pending.pop() {
                    warn!(
                        track_id = %dropped.id,
                        "Retry limit of {} reached, dropping candidate",
                        self.config.retry_limit
                    );
                    self.drop_candidate(&mut report, dropped.id).await;
                }
                run_failures = 0;
                continue;
            }

            let Some(mut candidate) = pending.pop() else {
                break;
            };
            candidate.attempts += 1;
            report.iterations += 1;

            let id = candidate.id;
            let attempt = candidate.attempts;
            debug!(track_id = %id, attempt, "Processing candidate");
            self.emit(QueueEvent::Attempt { id, attempt }).await;

            match self.pipeline.process(session, id).await {
                Ok(TrackOutcome::Synced { path }) => {
                    quota -= 1;
                    report.synced.insert(0, id);
                    info!(track_id = %id, attempt, "Synced {}", path.display());
                    self.emit(QueueEvent::Synced { id, path }).await;
                }
                Ok(TrackOutcome::Skipped(reason)) => {
                    quota -= 1;
                    report.synced.insert(0, id);
                    report.skipped.push((id, reason));
                    warn!(track_id = %id, "Skipping track: {}", reason);
                    self.emit(QueueEvent::Skipped { id, reason }).await;
                }
                Err(e) => {
                    error!(track_id = %id, attempt, "Attempt failed: {}", e);

                    let exhausted = self.config.retry_scope == RetryScope::PerCandidate
                        && attempt >= self.config.retry_limit;
                    if exhausted {
                        warn!(track_id = %id, "Giving up after {} attempts", attempt);
                        self.drop_candidate(&mut report, id).await;
                    } else {
                        run_failures += 1;
                        pending.push(candidate);
                        self.emit(QueueEvent::Failed {
                            id,
                            attempt,
                            message: e.to_string(),
                        })
                        .await;
                    }
                }
            }

            tokio::time::sleep(self.config.delay).await;
            report.pauses += 1;
        }

        report.pending = pending.iter().map(|c| c.id).collect();

        info!(
            "Queue finished: {} recorded, {} dropped, {} left pending",
            report.synced.len(),
            report.dropped.len(),
            report.pending.len()
        );
        self.emit(QueueEvent::Finished {
            synced: report.synced.len(),
            pending: report.unsynced(),
        })
        .await;

        report
    }

    async fn drop_candidate(&self, report: &mut QueueReport, id: TrackId) {
        report.dropped.push(id);
        self.emit(QueueEvent::Dropped { id }).await;
    }

    async fn emit(&self, event: QueueEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::{FakeApi, TestDirs};

    fn ids(raw: &[u64]) -> Vec<TrackId> {
        raw.iter().copied().map(TrackId).collect()
    }

    fn queue(api: Arc<FakeApi>, dirs: &TestDirs, limit: usize, scope: RetryScope) -> DownloadQueue {
        DownloadQueue::new(api, dirs.queue_config(limit, 3, scope))
    }

    #[tokio::test]
    async fn test_failing_candidate_retried_then_dropped() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().failing([TrackId(2)]));

        let report = queue(api.clone(), &dirs, 2, RetryScope::PerCandidate)
            .run(&Session::new("c"), ids(&[1, 2, 3]))
            .await;

        assert!(report.synced.len() <= 2);
        assert_eq!(report.synced, ids(&[1, 3]));
        assert_eq!(report.dropped, ids(&[2]));
        assert_eq!(api.detail_calls(TrackId(2)), 3);
        assert_eq!(report.iterations, 5);
        assert_eq!(report.pauses, report.iterations);
        assert!(report.pending.is_empty());
    }

    #[tokio::test]
    async fn test_lyric_failure_requeued_then_dropped() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().failing_lyrics([TrackId(2)]));
        let mut config = dirs.queue_config(5, 3, RetryScope::PerCandidate);
        config.download_lyrics = true;
        let (tx, mut rx) = mpsc::channel(64);

        let report = DownloadQueue::new(api.clone(), config)
            .with_events(tx)
            .run(&Session::new("c"), ids(&[1, 2]))
            .await;

        let mut requeued = Vec::new();
        let mut dropped = false;
        while let Some(event) = rx.recv().await {
            match event {
                QueueEvent::Failed { id: TrackId(2), attempt, .. } => requeued.push(attempt),
                QueueEvent::Dropped { id: TrackId(2) } => dropped = true,
                _ => {}
            }
        }

        // The third failure exhausts the budget instead of requeueing
        assert_eq!(requeued, vec![1, 2]);
        assert!(dropped);
        assert_eq!(api.lyric_calls(TrackId(2)), 3);
        assert_eq!(report.synced, ids(&[1]));
        assert_eq!(report.dropped, ids(&[2]));
        assert!(!dirs.music.join("Artist 2 - Track 2.flac").exists());
        // Downloaded audio for the dropped track does not linger
        assert!(std::fs::read_dir(&dirs.temp).unwrap().next().is_none());
        assert!(std::fs::read_dir(&dirs.covers).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_run_scope_drops_after_shared_budget() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().failing([TrackId(2)]));

        let report = queue(api.clone(), &dirs, 2, RetryScope::Run)
            .run(&Session::new("c"), ids(&[1, 2, 3]))
            .await;

        assert_eq!(report.synced, ids(&[1, 3]));
        assert_eq!(report.dropped, ids(&[2]));
        assert_eq!(api.detail_calls(TrackId(2)), 3);
        assert_eq!(report.pauses, report.iterations);
    }

    #[tokio::test]
    async fn test_run_scope_counter_is_shared() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().failing([TrackId(1), TrackId(2)]));

        let report = queue(api.clone(), &dirs, 5, RetryScope::Run)
            .run(&Session::new("c"), ids(&[1, 2]))
            .await;

        // Candidate 2 burns the whole budget, then 1 gets a fresh one
        assert!(report.synced.is_empty());
        assert_eq!(report.dropped, ids(&[2, 1]));
        assert_eq!(api.detail_calls(TrackId(2)), 3);
        assert_eq!(api.detail_calls(TrackId(1)), 3);
        assert_eq!(report.pauses, 6);
    }

    #[tokio::test]
    async fn test_unlicensed_recorded_without_download() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().unlicensed([TrackId(7)]));

        let report = queue(api.clone(), &dirs, 10, RetryScope::PerCandidate)
            .run(&Session::new("c"), ids(&[7]))
            .await;

        assert_eq!(report.synced, ids(&[7]));
        assert_eq!(report.skipped, vec![(TrackId(7), SkipReason::Unlicensed)]);
        assert!(api.downloads().is_empty());
        assert_eq!(api.detail_calls(TrackId(7)), 1);
    }

    #[tokio::test]
    async fn test_preview_only_recorded_without_download() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().preview([TrackId(8)]));

        let report = queue(api.clone(), &dirs, 10, RetryScope::PerCandidate)
            .run(&Session::new("c"), ids(&[8, 9]))
            .await;

        assert_eq!(report.synced, ids(&[8, 9]));
        assert_eq!(report.skipped, vec![(TrackId(8), SkipReason::PreviewOnly)]);
        assert!(api.downloads().iter().all(|url| !url.contains("/8.")));
    }

    #[tokio::test]
    async fn test_quota_leaves_rest_pending() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new());

        let report = queue(api, &dirs, 2, RetryScope::PerCandidate)
            .run(&Session::new("c"), ids(&[1, 2, 3, 4, 5]))
            .await;

        assert_eq!(report.synced, ids(&[4, 5]));
        assert_eq!(report.pending, ids(&[1, 2, 3]));
        assert_eq!(report.unsynced(), 3);
        assert_eq!(report.pauses, 2);
    }

    #[tokio::test]
    async fn test_empty_run_does_nothing() {
        let dirs = TestDirs::new();
        let report = queue(Arc::new(FakeApi::new()), &dirs, 10, RetryScope::PerCandidate)
            .run(&Session::new("c"), Vec::new())
            .await;

        assert_eq!(report.iterations, 0);
        assert_eq!(report.pauses, 0);
    }

    #[tokio::test]
    async fn test_events_reported() {
        let dirs = TestDirs::new();
        let api = Arc::new(FakeApi::new().unlicensed([TrackId(2)]));
        let (tx, mut rx) = mpsc::channel(64);

        queue(api, &dirs, 10, RetryScope::PerCandidate)
            .with_events(tx)
            .run(&Session::new("c"), ids(&[1, 2]))
            .await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(
            events.first(),
            Some(QueueEvent::Started { candidates: 2, quota: 2 })
        ));
        assert!(events.iter().any(|e| matches!(e, QueueEvent::Skipped { id: TrackId(2), .. })));
        assert!(events.iter().any(|e| matches!(e, QueueEvent::Synced { id: TrackId(1), .. })));
        assert!(matches!(
            events.last(),
            Some(QueueEvent::Finished { synced: 2, pending: 0 })
        ));
    }
}
