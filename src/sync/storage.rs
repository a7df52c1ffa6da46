//! Temp and library file placement

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::pipeline::CandidateError;
use crate::metadata::container::sniff;
use crate::metadata::{CanonicalTags, ContainerKind};
use crate::netease::TrackId;
use crate::utils::render_file_stem;

/// Where a track's files live before and after finalization
#[derive(Debug, Clone)]
pub struct LibraryStorage {
    temp_dir: PathBuf,
    cover_dir: PathBuf,
    music_dir: PathBuf,
    filename_template: String,
}

impl LibraryStorage {
    pub fn new(
        temp_dir: PathBuf,
        cover_dir: PathBuf,
        music_dir: PathBuf,
        filename_template: String,
    ) -> Self {
        Self {
            temp_dir,
            cover_dir,
            music_dir,
            filename_template,
        }
    }

    pub fn temp_audio_path(&self, id: TrackId, kind: ContainerKind) -> PathBuf {
        self.temp_dir.join(format!("{}.{}", id, kind.extension()))
    }

    pub fn temp_cover_path(&self, id: TrackId) -> PathBuf {
        self.cover_dir.join(format!("{}.jpg", id))
    }

    pub fn temp_lyric_path(&self, id: TrackId) -> PathBuf {
        self.temp_dir.join(format!("{}.lrc", id))
    }

    /// Final path for a track's audio file
    pub fn library_path(&self, tags: &CanonicalTags, kind: ContainerKind) -> PathBuf {
        let stem = render_file_stem(&self.filename_template, tags);
        self.music_dir.join(format!("{}.{}", stem, kind.extension()))
    }

    /// Move a finished track into the library, verify the audio file's
    /// signature, then move its lyric sidecar alongside
    ///
    /// A file whose content does not sniff as `kind` is removed again and the
    /// sidecar stays in the temp directory.
    pub async fn finalize(
        &self,
        id: TrackId,
        kind: ContainerKind,
        tags: &CanonicalTags,
        lyric: Option<&Path>,
    ) -> Result<PathBuf, CandidateError> {
        let audio_src = self.temp_audio_path(id, kind);
        let audio_dest = self.library_path(tags, kind);

        move_file(&audio_src, &audio_dest).await?;
        verify_signature(&audio_dest, kind).await?;

        // Only a validated track gets its sidecar
        if let Some(lyric_src) = lyric {
            let lyric_dest = audio_dest.with_extension("lrc");
            move_file(lyric_src, &lyric_dest).await?;
        }

        debug!("Finalized {} as {}", id, audio_dest.display());
        Ok(audio_dest)
    }
}

/// Rename, falling back to copy and remove across filesystems
async fn move_file(from: &Path, to: &Path) -> Result<(), CandidateError> {
    let move_err = |source| CandidateError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Err(e) = fs::rename(from, to).await {
        debug!(
            "rename {} -> {} failed ({}), copying instead",
            from.display(),
            to.display(),
            e
        );
        fs::copy(from, to).await.map_err(move_err)?;
        fs::remove_file(from).await.map_err(move_err)?;
    }
    Ok(())
}

async fn verify_signature(path: &Path, kind: ContainerKind) -> Result<(), CandidateError> {
    let owned = path.to_path_buf();
    let detected = tokio::task::spawn_blocking(move || sniff(&owned))
        .await
        .map_err(io::Error::other)
        .and_then(|sniffed| sniffed)
        .map_err(|source| CandidateError::Inspect {
            path: path.to_path_buf(),
            source,
        })?;

    if detected != Some(kind.file_type()) {
        if let Err(e) = fs::remove_file(path).await {
            warn!("Failed to remove corrupt file {}: {}", path.display(), e);
        }
        return Err(CandidateError::SignatureMismatch {
            path: path.to_path_buf(),
            expected: kind,
            detected,
        });
    }
    Ok(())
}
