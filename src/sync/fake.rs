//! In-process `MusicApi` for queue and pipeline tests

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::queue::QueueConfig;
use super::storage::LibraryStorage;
use crate::config::RetryScope;
use crate::lyrics::LyricSource;
use crate::netease::{MusicApi, Session, StreamInfo, TrackDetail, TrackId};

/// Serves a minimal FLAC stream for every track unless told otherwise
pub struct FakeApi {
    failing: HashSet<TrackId>,
    failing_lyrics: HashSet<TrackId>,
    unlicensed: HashSet<TrackId>,
    preview: HashSet<TrackId>,
    container: String,
    corrupt: bool,
    lyrics: LyricSource,
    detail_calls: Mutex<HashMap<TrackId, u32>>,
    lyric_calls: Mutex<HashMap<TrackId, u32>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            failing_lyrics: HashSet::new(),
            unlicensed: HashSet::new(),
            preview: HashSet::new(),
            container: "flac".to_string(),
            corrupt: false,
            lyrics: LyricSource::default(),
            detail_calls: Mutex::new(HashMap::new()),
            lyric_calls: Mutex::new(HashMap::new()),
            downloads: Mutex::new(Vec::new()),
        }
    }

    /// Detail lookups for these IDs always fail
    pub fn failing(mut self, ids: impl IntoIterator<Item = TrackId>) -> Self {
        self.failing.extend(ids);
        self
    }

    /// Lyric lookups for these IDs always fail
    pub fn failing_lyrics(mut self, ids: impl IntoIterator<Item = TrackId>) -> Self {
        self.failing_lyrics.extend(ids);
        self
    }

    pub fn unlicensed(mut self, ids: impl IntoIterator<Item = TrackId>) -> Self {
        self.unlicensed.extend(ids);
        self
    }

    pub fn preview(mut self, ids: impl IntoIterator<Item = TrackId>) -> Self {
        self.preview.extend(ids);
        self
    }

    /// Declared container type for playable tracks
    pub fn container(mut self, kind: &str) -> Self {
        self.container = kind.to_string();
        self
    }

    /// Serve an HTML error page instead of audio
    pub fn corrupt(mut self) -> Self {
        self.corrupt = true;
        self
    }

    pub fn with_lyrics(mut self, primary: &str, translation: &str) -> Self {
        self.lyrics = LyricSource {
            primary: Some(primary.to_string()),
            translation: Some(translation.to_string()),
            absent: false,
        };
        self
    }

    pub fn detail_calls(&self, id: TrackId) -> u32 {
        self.detail_calls
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn lyric_calls(&self, id: TrackId) -> u32 {
        self.lyric_calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

pub fn minimal_flac() -> Vec<u8> {
    let mut bytes = b"fLaC".to_vec();
    bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    bytes.extend_from_slice(&[0u8; 0x22]);
    bytes.extend_from_slice(b"frames");
    bytes
}

#[async_trait]
impl MusicApi for FakeApi {
    async fn track_detail(&self, _session: &Session, id: TrackId) -> Result<TrackDetail> {
        *self.detail_calls.lock().unwrap().entry(id).or_insert(0) += 1;

        if self.failing.contains(&id) {
            bail!("simulated failure for {}", id);
        }

        Ok(serde_json::from_value(json!({
            "id": id.0,
            "name": format!("Track {}", id),
            "ar": [{ "name": format!("Artist {}", id) }],
            "al": { "name": "Album", "picUrl": format!("http://img.test/{}.jpg", id) },
            "publishTime": 1_059_609_600_000i64,
            "cd": "01",
            "no": id.0,
        }))?)
    }

    async fn stream_info(&self, _session: &Session, id: TrackId, _bitrate: u32) -> Result<StreamInfo> {
        if self.unlicensed.contains(&id) {
            return Ok(StreamInfo {
                code: 404,
                url: None,
                kind: None,
                free_trial: None,
            });
        }

        Ok(StreamInfo {
            code: 200,
            url: Some(format!("http://cdn.test/{}.{}", id, self.container)),
            kind: Some(self.container.clone()),
            free_trial: self
                .preview
                .contains(&id)
                .then(|| json!({ "start": 0, "end": 30 })),
        })
    }

    async fn lyrics(&self, _session: &Session, id: TrackId) -> Result<LyricSource> {
        *self.lyric_calls.lock().unwrap().entry(id).or_insert(0) += 1;

        if self.failing_lyrics.contains(&id) {
            bail!("simulated lyric failure for {}", id);
        }
        Ok(self.lyrics.clone())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloads.lock().unwrap().push(url.to_string());

        let body = if url.ends_with(".jpg") {
            b"\x89PNG\r\n\x1a\n".to_vec()
        } else if self.corrupt {
            b"<html>502 Bad Gateway</html>".to_vec()
        } else {
            minimal_flac()
        };
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}

/// Scratch temp, cover and music directories
pub struct TestDirs {
    _root: tempfile::TempDir,
    pub temp: PathBuf,
    pub covers: PathBuf,
    pub music: PathBuf,
}

impl TestDirs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let temp = root.path().join("temp");
        let covers = root.path().join("covers");
        let music = root.path().join("music");
        for dir in [&temp, &covers, &music] {
            std::fs::create_dir_all(dir).unwrap();
        }
        Self {
            _root: root,
            temp,
            covers,
            music,
        }
    }

    pub fn storage(&self) -> LibraryStorage {
        LibraryStorage::new(
            self.temp.clone(),
            self.covers.clone(),
            self.music.clone(),
            "{artist} - {title}".to_string(),
        )
    }

    pub fn queue_config(&self, limit: usize, retry_limit: u32, scope: RetryScope) -> QueueConfig {
        QueueConfig {
            download_limit: limit,
            delay: Duration::ZERO,
            retry_limit,
            retry_scope: scope,
            bitrate: 320_000,
            download_lyrics: false,
            download_translation: false,
            filename_template: "{artist} - {title}".to_string(),
            temp_dir: self.temp.clone(),
            cover_dir: self.covers.clone(),
            music_dir: self.music.clone(),
        }
    }
}
