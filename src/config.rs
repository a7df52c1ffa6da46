//! Configuration file handling
//!
//! Settings live in ~/.config/netune/config.toml unless `--config` points
//! elsewhere. Everything except the account section has a default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::sync::QueueConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Gateway connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000".to_string(),
            request_timeout_ms: 3000,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Account and playlist to mirror
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub phone: String,
    /// Hex MD5 digest of the password
    #[serde(default)]
    pub md5_password: Option<String>,
    /// Plain password, hashed before login
    #[serde(default)]
    pub password: Option<String>,
    pub playlist_id: u64,
}

/// How failed candidates are charged against the retry limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// Each candidate has its own attempt count
    #[default]
    PerCandidate,
    /// One counter shared by the whole run, reset after each forced drop
    Run,
}

/// Download queue behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub download_limit: usize,
    pub download_delay_ms: u64,
    pub retry_limit: u32,
    pub retry_scope: RetryScope,
    pub bitrate: u32,
    pub filename_template: String,
    pub save_session: bool,
    pub download_lyrics: bool,
    pub download_translation: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            download_limit: 10,
            download_delay_ms: 3000,
            retry_limit: 3,
            retry_scope: RetryScope::default(),
            bitrate: 320_000,
            filename_template: "{artist} - {title}".to_string(),
            save_session: true,
            download_lyrics: true,
            download_translation: true,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub temp_dir: PathBuf,
    pub cover_dir: PathBuf,
    pub music_dir: PathBuf,
    /// Session cookie and sync ledger
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("netune");
        Self {
            temp_dir: base.join("temp"),
            cover_dir: base.join("covers"),
            music_dir: base.join("music"),
            data_dir: base,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("netune").join("config.toml"))
    }

    /// Load and validate the config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "No config file at {}. Create one with an [account] section (phone, password, playlist_id).",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sync.retry_limit == 0 {
            anyhow::bail!("sync.retry_limit must be at least 1");
        }
        if !self.sync.filename_template.contains("{title}") {
            anyhow::bail!("sync.filename_template must contain {{title}}");
        }
        Ok(())
    }

    /// Create every configured directory
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.paths.temp_dir,
            &self.paths.cover_dir,
            &self.paths.music_dir,
            &self.paths.data_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }
        Ok(())
    }

    /// Queue settings for one run
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            download_limit: self.sync.download_limit,
            delay: Duration::from_millis(self.sync.download_delay_ms),
            retry_limit: self.sync.retry_limit,
            retry_scope: self.sync.retry_scope,
            bitrate: self.sync.bitrate,
            download_lyrics: self.sync.download_lyrics,
            download_translation: self.sync.download_translation,
            filename_template: self.sync.filename_template.clone(),
            temp_dir: self.paths.temp_dir.clone(),
            cover_dir: self.paths.cover_dir.clone(),
            music_dir: self.paths.music_dir.clone(),
        }
    }
}
