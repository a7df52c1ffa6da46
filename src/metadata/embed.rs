//! Tag and cover art embedding, dispatched on container kind
//!
//! Both strategies do blocking file I/O, so the async entry point runs them on
//! the blocking pool and resolves only once the file is final.

use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::container::ContainerKind;
use super::cover::CoverArt;
use super::flac;
use super::tags::CanonicalTags;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("I/O error while embedding: {0}")]
    Io(#[from] std::io::Error),

    #[error("tag library error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    #[error("file has no ID3v2 tag slot")]
    NoTagSlot,

    #[error("not a FLAC stream")]
    NotFlac,

    #[error("metadata block {index} is malformed: {source}")]
    MalformedBlock {
        index: usize,
        source: std::io::Error,
    },

    #[error("{kind} block of {len} bytes exceeds the 16 MiB block limit")]
    BlockTooLarge { kind: String, len: usize },

    #[error("embedding task panicked: {0}")]
    TaskPanicked(#[from] tokio::task::JoinError),
}

/// Embed tags and an optional cover image into `audio`
///
/// The cover file is read but left in place; callers own its cleanup.
pub async fn embed(
    kind: ContainerKind,
    audio: PathBuf,
    cover: Option<PathBuf>,
    tags: CanonicalTags,
) -> Result<(), EmbedError> {
    tokio::task::spawn_blocking(move || embed_blocking(kind, &audio, cover.as_deref(), &tags))
        .await?
}

/// Synchronous embedding (called from spawn_blocking)
pub fn embed_blocking(
    kind: ContainerKind,
    audio: &Path,
    cover: Option<&Path>,
    tags: &CanonicalTags,
) -> Result<(), EmbedError> {
    let cover = cover.map(CoverArt::load).transpose()?;

    match kind {
        ContainerKind::Mp3 => write_id3(audio, cover.as_ref(), tags),
        ContainerKind::Flac => flac::rewrite_file(audio, cover.as_ref(), tags),
    }
}

/// Write a fresh ID3v2 tag carrying the canonical fields and front cover
fn write_id3(path: &Path, cover: Option<&CoverArt>, tags: &CanonicalTags) -> Result<(), EmbedError> {
    let mut tagged_file = Probe::open(path)?.guess_file_type()?.read()?;

    tagged_file.insert_tag(Tag::new(TagType::Id3v2));
    let tag = tagged_file
        .tag_mut(TagType::Id3v2)
        .ok_or(EmbedError::NoTagSlot)?;

    tag.set_title(tags.title.clone());
    tag.set_album(tags.album.clone());
    tag.set_artist(tags.artist.clone());
    if let Some(year) = tags.year.and_then(|y| u32::try_from(y).ok()) {
        tag.set_year(year);
    }
    if let Some(disc) = tags.disc_number() {
        tag.set_disk(disc);
    }
    tag.set_track(tags.track);

    if let Some(cover) = cover {
        tag.push_picture(cover.to_picture());
    }

    tagged_file.save_to_path(path, WriteOptions::default())?;

    debug!("Wrote ID3v2 tag: {}", path.display());
    Ok(())
}
