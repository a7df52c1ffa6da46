//! NetEase Cloud Music API response models

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metadata::ContainerKind;

/// Remote-assigned track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated session context passed to every gateway call
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    cookie: String,
}

impl Session {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
        }
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }
}

// Cookies are credentials, keep them out of debug logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookie", &format_args!("<{} bytes>", self.cookie.len()))
            .finish()
    }
}

// Login response (/login/cellphone)
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub code: i64,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

// Account response (/user/account)
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub code: i64,
    #[serde(default)]
    pub profile: Option<Account>,
}

/// Logged-in user profile
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(rename = "userId")]
    pub user_id: u64,
    pub nickname: String,
}

// Playlist response (/playlist/detail)
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResponse {
    pub code: i64,
    pub playlist: PlaylistDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDetail {
    pub id: u64,
    pub name: String,
    #[serde(default, rename = "trackIds")]
    pub track_ids: Vec<TrackRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackRef {
    pub id: TrackId,
}

// Song detail response (/song/detail)
#[derive(Debug, Clone, Deserialize)]
pub struct SongDetailResponse {
    #[serde(default)]
    pub songs: Vec<TrackDetail>,
}

/// Remote track record as returned by the detail endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TrackDetail {
    pub id: TrackId,
    pub name: String,
    #[serde(rename = "ar")]
    pub artists: Vec<ArtistRef>,
    #[serde(rename = "al")]
    pub album: AlbumRef,
    /// Milliseconds since the Unix epoch
    #[serde(default, rename = "publishTime")]
    pub publish_time: i64,
    /// Disc index, served as a string such as "01"
    #[serde(default, rename = "cd")]
    pub disc: Option<String>,
    #[serde(default, rename = "no")]
    pub track: u32,
}

impl TrackDetail {
    pub fn cover_url(&self) -> Option<&str> {
        self.album.pic_url.as_deref().filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default, rename = "picUrl")]
    pub pic_url: Option<String>,
}

// Stream URL response (/song/url)
#[derive(Debug, Clone, Deserialize)]
pub struct SongUrlResponse {
    #[serde(default)]
    pub data: Vec<StreamInfo>,
}

/// Download information for one track at a requested bitrate
#[derive(Debug, Clone, Deserialize)]
pub struct StreamInfo {
    pub code: i64,
    #[serde(default)]
    pub url: Option<String>,
    /// Declared container, e.g. "mp3" or "flac"
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "freeTrialInfo")]
    pub free_trial: Option<serde_json::Value>,
}

/// What the gateway is willing to hand out for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// No licensed resource
    Unavailable,
    /// Only a trial clip is served
    PreviewOnly,
    Playable {
        url: String,
        container: Option<ContainerKind>,
    },
}

impl StreamInfo {
    pub fn availability(&self) -> Availability {
        let url = match self.url.as_deref() {
            Some(url) if self.code == 200 && !url.is_empty() => url,
            _ => return Availability::Unavailable,
        };

        if self.free_trial.as_ref().is_some_and(|v| !v.is_null()) {
            return Availability::PreviewOnly;
        }

        let container = self
            .kind
            .as_deref()
            .and_then(ContainerKind::from_declared)
            .or_else(|| ContainerKind::from_url(url));

        Availability::Playable {
            url: url.to_string(),
            container,
        }
    }
}

// Lyric response (/lyric)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricResponse {
    #[serde(default)]
    pub lrc: Option<LyricBody>,
    #[serde(default)]
    pub tlyric: Option<LyricBody>,
    #[serde(default)]
    pub nolyric: bool,
    #[serde(default)]
    pub uncollected: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricBody {
    #[serde(default)]
    pub lyric: Option<String>,
}
