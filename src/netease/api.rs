//! The remote operations the download queue depends on

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use super::models::{Session, StreamInfo, TrackDetail, TrackId};
use crate::lyrics::LyricSource;

/// Per-track remote operations
///
/// Implemented by [`NeteaseClient`](super::NeteaseClient) against a live
/// gateway and by in-process fakes in tests.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Fetch the detail record for a single track
    async fn track_detail(&self, session: &Session, id: TrackId) -> Result<TrackDetail>;

    /// Resolve the streamable resource for a track at the given bitrate
    async fn stream_info(&self, session: &Session, id: TrackId, bitrate: u32)
        -> Result<StreamInfo>;

    /// Fetch original and translated lyrics
    async fn lyrics(&self, session: &Session, id: TrackId) -> Result<LyricSource>;

    /// Stream a binary resource (audio or cover art) to `dest`, returning bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}
