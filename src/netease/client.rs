//! NetEase Cloud Music API gateway HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::api::MusicApi;
use super::models::*;
use crate::lyrics::LyricSource;

/// Connect timeout for CDN downloads; bodies may take far longer
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a NetEase Cloud Music API gateway
#[derive(Clone)]
pub struct NeteaseClient {
    base_url: String,
    request_timeout: Duration,
    http_client: Client,
}

impl NeteaseClient {
    /// Create a new gateway client
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let http_client = Client::builder()
            .user_agent(concat!("netune/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            request_timeout,
            http_client,
        })
    }

    /// Issue a GET against a gateway route and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        session: Option<&Session>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!("GET {} {:?}", url, params);

        let mut request = self
            .http_client
            .get(&url)
            .query(params)
            .timeout(self.request_timeout);

        if let Some(session) = session {
            request = request.query(&[("cookie", session.cookie())]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach gateway route /{}", endpoint))?
            .error_for_status()
            .with_context(|| format!("Gateway route /{} returned an error status", endpoint))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse /{} response", endpoint))
    }

    /// Log in with a phone number and MD5 password digest
    pub async fn login(&self, phone: &str, md5_password: &str) -> Result<Session> {
        let response: LoginResponse = self
            .get_json(
                "login/cellphone",
                &[
                    ("phone", phone.to_string()),
                    ("md5_password", md5_password.to_string()),
                ],
                None,
            )
            .await?;

        if response.code != 200 {
            anyhow::bail!(
                "Login rejected (code {}): {}",
                response.code,
                response.message.as_deref().unwrap_or("no message")
            );
        }

        match response.cookie {
            Some(cookie) if !cookie.is_empty() => Ok(Session::new(cookie)),
            _ => anyhow::bail!("Login succeeded but the gateway returned no cookie"),
        }
    }

    /// Look up the account behind a session; `None` means the session expired
    pub async fn account(&self, session: &Session) -> Result<Option<Account>> {
        let response: AccountResponse = self.get_json("user/account", &[], Some(session)).await?;

        if response.code != 200 {
            return Ok(None);
        }
        Ok(response.profile)
    }

    /// Get the track IDs of a playlist in remote order
    pub async fn playlist_track_ids(
        &self,
        session: &Session,
        playlist_id: u64,
    ) -> Result<Vec<TrackId>> {
        let response: PlaylistResponse = self
            .get_json(
                "playlist/detail",
                &[("id", playlist_id.to_string())],
                Some(session),
            )
            .await?;

        if response.code != 200 {
            anyhow::bail!("Playlist {} not available (code {})", playlist_id, response.code);
        }

        debug!(
            "Playlist {} '{}' has {} tracks",
            response.playlist.id,
            response.playlist.name,
            response.playlist.track_ids.len()
        );
        Ok(response
            .playlist
            .track_ids
            .into_iter()
            .map(|t| t.id)
            .collect())
    }
}

#[async_trait]
impl MusicApi for NeteaseClient {
    async fn track_detail(&self, session: &Session, id: TrackId) -> Result<TrackDetail> {
        let response: SongDetailResponse = self
            .get_json("song/detail", &[("ids", id.to_string())], Some(session))
            .await?;

        response
            .songs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Track {} not found", id))
    }

    async fn stream_info(
        &self,
        session: &Session,
        id: TrackId,
        bitrate: u32,
    ) -> Result<StreamInfo> {
        let response: SongUrlResponse = self
            .get_json(
                "song/url",
                &[("id", id.to_string()), ("br", bitrate.to_string())],
                Some(session),
            )
            .await?;

        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No stream information for track {}", id))
    }

    async fn lyrics(&self, session: &Session, id: TrackId) -> Result<LyricSource> {
        let response: LyricResponse = self
            .get_json("lyric", &[("id", id.to_string())], Some(session))
            .await?;

        Ok(LyricSource {
            primary: response.lrc.and_then(|b| b.lyric),
            translation: response.tlyric.and_then(|b| b.lyric),
            absent: response.nolyric || response.uncollected,
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!("Downloading {} -> {}", url, dest.display());

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to start download")?
            .error_for_status()
            .context("Download rejected")?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Download interrupted")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write download chunk")?;
            written += chunk.len() as u64;
        }
        file.flush().await.context("Failed to flush download")?;

        if written == 0 {
            anyhow::bail!("Downloaded an empty body from {}", url);
        }

        debug!("Downloaded {} bytes", written);
        Ok(written)
    }
}
