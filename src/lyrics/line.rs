//! Timestamped lyric lines (`[MM:SS.hh]text` / `[MM:SS:hh]text`)

use regex::Regex;
use std::sync::LazyLock;

static TIMESTAMPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d+:\d+)([.:])(\d+)\](.*)$").expect("lyric timestamp pattern is valid")
});

/// A lyric line whose timestamp matched the grammar
///
/// Timestamp parts are kept as the literal strings from the source so that
/// matching between original and translated lines compares text, not time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// Whole-second prefix, `MM:SS`
    pub time: String,
    /// Separator before the fraction, `.` or `:`
    pub separator: char,
    /// Fractional-second token as written
    pub fraction: String,
    pub text: String,
}

impl LyricLine {
    /// Far-future stamp given to a translation of the final original line
    pub fn sentinel(text: impl Into<String>) -> Self {
        Self {
            time: "99:99".to_string(),
            separator: ':',
            fraction: "99".to_string(),
            text: text.into(),
        }
    }

    /// Parse a raw line, `None` if it does not match the grammar
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = TIMESTAMPED.captures(raw)?;
        Some(Self {
            time: caps[1].to_string(),
            separator: caps[2].chars().next().unwrap_or('.'),
            fraction: caps[3].to_string(),
            text: caps[4].to_string(),
        })
    }

    /// Whether both lines carry the same literal timestamp
    pub fn same_stamp(&self, other: &LyricLine) -> bool {
        self.time == other.time && self.fraction == other.fraction
    }

    /// Copy of `self` carrying `other`'s timestamp
    pub fn restamped(&self, other: &LyricLine) -> Self {
        Self {
            time: other.time.clone(),
            separator: other.separator,
            fraction: other.fraction.clone(),
            text: self.text.clone(),
        }
    }

    /// Render with the fraction forced to exactly two digits
    pub fn render(&self) -> String {
        let fraction: String = if self.fraction.len() == 2 {
            self.fraction.clone()
        } else {
            format!("{:0<2}", self.fraction).chars().take(2).collect()
        };
        format!("[{}{}{}]{}", self.time, self.separator, fraction, self.text)
    }
}
