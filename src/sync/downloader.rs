//! Binary resource fetching for one track

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::pipeline::CandidateError;
use crate::netease::MusicApi;

/// Downloads audio and cover payloads to temp paths
#[derive(Clone)]
pub struct Downloader {
    api: Arc<dyn MusicApi>,
}

impl Downloader {
    pub fn new(api: Arc<dyn MusicApi>) -> Self {
        Self { api }
    }

    /// Download the audio stream
    pub async fn fetch_audio(&self, url: &str, dest: &Path) -> Result<u64, CandidateError> {
        self.fetch("audio", url, dest).await
    }

    /// Download cover art
    pub async fn fetch_cover(&self, url: &str, dest: &Path) -> Result<u64, CandidateError> {
        self.fetch("cover art", url, dest).await
    }

    async fn fetch(&self, what: &'static str, url: &str, dest: &Path) -> Result<u64, CandidateError> {
        debug!("Downloading {} from {} to {}", what, url, dest.display());

        let bytes = self
            .api
            .download(url, dest)
            .await
            .map_err(|error| CandidateError::Download { what, error })?;

        debug!("Downloaded {} bytes of {}", bytes, what);
        Ok(bytes)
    }
}
