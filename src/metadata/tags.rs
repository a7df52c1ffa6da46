//! Canonical tag set derived from a remote track record

use chrono::{Datelike, Local, TimeZone};

use crate::netease::TrackDetail;

/// Artists beyond this count are left out to keep filenames bounded
pub const MAX_ARTISTS: usize = 5;

/// Normalised fields written into audio containers and used for naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTags {
    pub title: String,
    pub album: String,
    /// Calendar year of the publish timestamp, `None` if out of range
    pub year: Option<i32>,
    pub artist: String,
    /// Disc index as served, e.g. "01"
    pub disc: String,
    pub track: u32,
}

impl CanonicalTags {
    /// Derive tags, computing the release year in the system timezone
    pub fn from_detail(detail: &TrackDetail) -> Self {
        Self::from_detail_in(detail, &Local)
    }

    pub fn from_detail_in<Tz: TimeZone>(detail: &TrackDetail, tz: &Tz) -> Self {
        Self {
            title: detail.name.clone(),
            album: detail.album.name.clone(),
            year: release_year(detail.publish_time, tz),
            artist: join_artists(detail.artists.iter().map(|a| a.name.as_str())),
            disc: detail.disc.clone().unwrap_or_default(),
            track: detail.track,
        }
    }

    /// Numeric disc index for containers that store it as an integer
    pub fn disc_number(&self) -> Option<u32> {
        let digits: String = self
            .disc
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

fn release_year<Tz: TimeZone>(publish_time_ms: i64, tz: &Tz) -> Option<i32> {
    tz.timestamp_millis_opt(publish_time_ms)
        .earliest()
        .map(|dt| dt.year())
}

fn join_artists<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.take(MAX_ARTISTS).collect::<Vec<_>>().join(", ")
}
