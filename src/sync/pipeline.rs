//! Processing of a single candidate track
//!
//! One pass runs detail fetch, availability check, audio and cover download,
//! tag embedding, lyric merge and finalization in order. Every failure is a
//! [`CandidateError`], which the queue treats as transient.

use lofty::file::FileType;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use super::downloader::Downloader;
use super::storage::LibraryStorage;
use crate::lyrics;
use crate::metadata::{self, CanonicalTags, ContainerKind, EmbedError};
use crate::netease::{Availability, MusicApi, Session, TrackDetail, TrackId};

/// A recoverable failure while processing one candidate
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("remote request failed: {0:#}")]
    Remote(anyhow::Error),

    #[error("failed to download {what}: {error:#}")]
    Download {
        what: &'static str,
        error: anyhow::Error,
    },

    #[error("unsupported container {0:?}")]
    UnsupportedContainer(Option<String>),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("failed to write lyrics to {}: {source}", .path.display())]
    LyricWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a valid {expected} file (detected {detected:?})", .path.display())]
    SignatureMismatch {
        path: PathBuf,
        expected: ContainerKind,
        detected: Option<FileType>,
    },

    #[error("failed to inspect {}: {source}", .path.display())]
    Inspect {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a track was recorded without being downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No licensed resource
    Unlicensed,
    /// Only a trial clip is available
    PreviewOnly,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlicensed => f.write_str("not licensed"),
            Self::PreviewOnly => f.write_str("preview only"),
        }
    }
}

/// Terminal result of processing a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Synced { path: PathBuf },
    Skipped(SkipReason),
}

/// Lyric handling for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricOptions {
    pub enabled: bool,
    pub translation: bool,
}

pub struct TrackPipeline {
    api: Arc<dyn MusicApi>,
    downloader: Downloader,
    storage: LibraryStorage,
    bitrate: u32,
    lyrics: LyricOptions,
}

impl TrackPipeline {
    pub fn new(
        api: Arc<dyn MusicApi>,
        storage: LibraryStorage,
        bitrate: u32,
        lyrics: LyricOptions,
    ) -> Self {
        Self {
            downloader: Downloader::new(api.clone()),
            api,
            storage,
            bitrate,
            lyrics,
        }
    }

    /// Run one attempt for `id`
    pub async fn process(
        &self,
        session: &Session,
        id: TrackId,
    ) -> Result<TrackOutcome, CandidateError> {
        let detail = self
            .api
            .track_detail(session, id)
            .await
            .map_err(CandidateError::Remote)?;
        let tags = CanonicalTags::from_detail(&detail);
        debug!("Resolved {} as {} - {}", detail.id, tags.artist, tags.title);

        let stream = self
            .api
            .stream_info(session, id, self.bitrate)
            .await
            .map_err(CandidateError::Remote)?;

        let (url, kind) = match stream.availability() {
            Availability::Unavailable => return Ok(TrackOutcome::Skipped(SkipReason::Unlicensed)),
            Availability::PreviewOnly => {
                return Ok(TrackOutcome::Skipped(SkipReason::PreviewOnly));
            }
            Availability::Playable {
                url,
                container: Some(kind),
            } => (url, kind),
            Availability::Playable {
                container: None, ..
            } => return Err(CandidateError::UnsupportedContainer(stream.kind.clone())),
        };

        let result = self.fetch_and_finalize(session, id, &detail, &url, kind, &tags).await;
        if result.is_err() {
            self.discard_temp_files(id, kind).await;
        }
        result
    }

    async fn fetch_and_finalize(
        &self,
        session: &Session,
        id: TrackId,
        detail: &TrackDetail,
        url: &str,
        kind: ContainerKind,
        tags: &CanonicalTags,
    ) -> Result<TrackOutcome, CandidateError> {
        let audio = self.storage.temp_audio_path(id, kind);
        self.downloader.fetch_audio(url, &audio).await?;

        let cover = match detail.cover_url() {
            Some(cover_url) => {
                let path = self.storage.temp_cover_path(id);
                self.downloader.fetch_cover(cover_url, &path).await?;
                Some(path)
            }
            None => {
                debug!("Track {} has no cover art", id);
                None
            }
        };

        let embedded = metadata::embed(kind, audio, cover.clone(), tags.clone()).await;
        if let Some(cover) = &cover {
            if let Err(e) = fs::remove_file(cover).await {
                warn!("Failed to remove temp cover {}: {}", cover.display(), e);
            }
        }
        embedded?;

        let lyric = if self.lyrics.enabled {
            self.write_lyrics(session, id).await?
        } else {
            None
        };

        let path = self
            .storage
            .finalize(id, kind, tags, lyric.as_deref())
            .await?;
        Ok(TrackOutcome::Synced { path })
    }

    /// Remove whatever a failed attempt left in the temp and cover folders
    async fn discard_temp_files(&self, id: TrackId, kind: ContainerKind) {
        let leftovers = [
            self.storage.temp_audio_path(id, kind),
            self.storage.temp_cover_path(id),
            self.storage.temp_lyric_path(id),
        ];
        for path in &leftovers {
            match fs::remove_file(path).await {
                Ok(()) => debug!("Removed leftover {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove leftover {}: {}", path.display(), e),
            }
        }
    }

    /// Merge lyrics into a temp sidecar, `None` if the track has none
    async fn write_lyrics(
        &self,
        session: &Session,
        id: TrackId,
    ) -> Result<Option<PathBuf>, CandidateError> {
        let source = self
            .api
            .lyrics(session, id)
            .await
            .map_err(CandidateError::Remote)?;

        let Some(body) = lyrics::merge(&source, self.lyrics.translation) else {
            debug!("No lyrics for {}", id);
            return Ok(None);
        };

        let path = self.storage.temp_lyric_path(id);
        fs::write(&path, body)
            .await
            .map_err(|source| CandidateError::LyricWrite {
                path: path.clone(),
                source,
            })?;
        Ok(Some(path))
    }
}
