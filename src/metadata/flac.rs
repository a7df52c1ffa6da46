//! FLAC metadata block rewriting
//!
//! A FLAC stream is the `fLaC` marker, a chain of metadata blocks (each a
//! one-byte header holding the last-block flag and block type, a 24-bit
//! big-endian length, then the body) and the audio frames. Tagging streams the
//! file once: existing picture and Vorbis comment blocks are dropped, fresh ones
//! are appended after the final original block, and the audio is copied as-is.

use lofty::picture::PictureInformation;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::cover::CoverArt;
use super::embed::EmbedError;
use super::tags::CanonicalTags;

const FLAC_MARKER: &[u8; 4] = b"fLaC";
const LAST_BLOCK_FLAG: u8 = 0x80;
const MAX_BLOCK_LEN: usize = (1 << 24) - 1;

/// Metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Reserved(u8),
}

impl BlockKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::StreamInfo,
            1 => Self::Padding,
            2 => Self::Application,
            3 => Self::SeekTable,
            4 => Self::VorbisComment,
            5 => Self::CueSheet,
            6 => Self::Picture,
            other => Self::Reserved(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::StreamInfo => 0,
            Self::Padding => 1,
            Self::Application => 2,
            Self::SeekTable => 3,
            Self::VorbisComment => 4,
            Self::CueSheet => 5,
            Self::Picture => 6,
            Self::Reserved(code) => code,
        }
    }

    /// Blocks replaced on every rewrite
    fn is_replaced(self) -> bool {
        matches!(self, Self::Picture | Self::VorbisComment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub last: bool,
    pub kind: BlockKind,
    pub len: usize,
}

impl BlockHeader {
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut raw = [0u8; 4];
        reader.read_exact(&mut raw)?;
        Ok(Self {
            last: raw[0] & LAST_BLOCK_FLAG != 0,
            kind: BlockKind::from_code(raw[0] & !LAST_BLOCK_FLAG),
            len: u32::from_be_bytes([0, raw[1], raw[2], raw[3]]) as usize,
        })
    }
}

fn write_block<W: Write>(
    writer: &mut W,
    kind: BlockKind,
    last: bool,
    body: &[u8],
) -> Result<(), EmbedError> {
    if body.len() > MAX_BLOCK_LEN {
        return Err(EmbedError::BlockTooLarge {
            kind: format!("{:?}", kind),
            len: body.len(),
        });
    }
    let len = (body.len() as u32).to_be_bytes();
    let flag = if last { LAST_BLOCK_FLAG } else { 0 };
    writer.write_all(&[flag | kind.code(), len[1], len[2], len[3]])?;
    writer.write_all(body)?;
    Ok(())
}

/// Body of a PICTURE block holding a front cover
pub fn picture_body(cover: &CoverArt) -> Vec<u8> {
    let picture = cover.to_picture();
    let info = PictureInformation::from_picture(&picture).unwrap_or_else(|e| {
        debug!("Cover dimensions unavailable, writing zeros: {}", e);
        PictureInformation::default()
    });
    picture.as_flac_bytes(info, false)
}

/// `KEY=VALUE` comments written for a track
pub fn comments_for(tags: &CanonicalTags) -> Vec<(&'static str, String)> {
    let mut comments = vec![("TITLE", tags.title.clone()), ("ALBUM", tags.album.clone())];
    if let Some(year) = tags.year {
        comments.push(("DATE", year.to_string()));
    }
    comments.push(("ARTIST", tags.artist.clone()));
    comments.push(("TRACKNUMBER", tags.track.to_string()));
    comments
}

/// Body of a VORBIS_COMMENT block (little-endian lengths, unlike block headers)
pub fn vorbis_comment_body(vendor: &str, comments: &[(&str, String)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    body.extend_from_slice(vendor.as_bytes());
    body.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for (key, value) in comments {
        let entry = format!("{}={}", key, value);
        body.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        body.extend_from_slice(entry.as_bytes());
    }
    body
}

fn vendor() -> String {
    format!("netune {}", env!("CARGO_PKG_VERSION"))
}

/// Rewrite a FLAC stream from `reader` into `writer` with fresh tags
pub fn rewrite_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    cover: Option<&CoverArt>,
    tags: &CanonicalTags,
) -> Result<(), EmbedError> {
    let mut marker = [0u8; 4];
    reader
        .read_exact(&mut marker)
        .map_err(|_| EmbedError::NotFlac)?;
    if &marker != FLAC_MARKER {
        return Err(EmbedError::NotFlac);
    }
    writer.write_all(FLAC_MARKER)?;

    let mut index = 0usize;
    loop {
        let header = BlockHeader::read_from(reader)
            .map_err(|e| EmbedError::MalformedBlock { index, source: e })?;
        let mut body = vec![0u8; header.len];
        reader
            .read_exact(&mut body)
            .map_err(|e| EmbedError::MalformedBlock { index, source: e })?;

        if header.kind.is_replaced() {
            debug!("Dropping existing {:?} block ({} bytes)", header.kind, header.len);
        } else {
            write_block(writer, header.kind, false, &body)?;
        }

        if header.last {
            break;
        }
        index += 1;
    }

    if let Some(cover) = cover {
        write_block(writer, BlockKind::Picture, false, &picture_body(cover))?;
    }
    let comments = vorbis_comment_body(&vendor(), &comments_for(tags));
    write_block(writer, BlockKind::VorbisComment, true, &comments)?;

    io::copy(reader, writer)?;
    Ok(())
}

/// The original file moved out of the way; removed when dropped
struct AsideFile {
    path: PathBuf,
}

impl AsideFile {
    fn move_aside(original: &Path) -> io::Result<Self> {
        let mut name = original.file_name().unwrap_or_default().to_os_string();
        name.push(".aside");
        let path = original.with_file_name(name);
        fs::rename(original, &path)?;
        Ok(Self { path })
    }
}

impl Drop for AsideFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Replace the picture and comment blocks of the FLAC file at `path`
pub fn rewrite_file(
    path: &Path,
    cover: Option<&CoverArt>,
    tags: &CanonicalTags,
) -> Result<(), EmbedError> {
    let aside = AsideFile::move_aside(path)?;

    let mut reader = BufReader::new(File::open(&aside.path)?);
    let mut writer = BufWriter::new(File::create(path)?);
    rewrite_stream(&mut reader, &mut writer, cover, tags)?;
    writer.flush()?;

    debug!("Rewrote FLAC metadata: {}", path.display());
    Ok(())
}
