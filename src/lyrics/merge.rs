//! Merge original and translated lyrics into one timed stream
//!
//! Each translated line is attached to the last original line carrying the
//! same literal timestamp and re-stamped with the following original line's
//! timestamp, so players keep highlighting the original while the translation
//! is shown beneath it.

use tracing::{debug, trace};

use super::line::LyricLine;

/// Raw lyric payload for one track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricSource {
    pub primary: Option<String>,
    pub translation: Option<String>,
    /// The remote explicitly reports that the track has no lyrics
    pub absent: bool,
}

/// Merge a lyric payload into a printable LRC body
///
/// Returns `None` when there is nothing worth writing.
pub fn merge(source: &LyricSource, include_translation: bool) -> Option<String> {
    if source.absent {
        return None;
    }
    let primary = source.primary.as_deref().filter(|p| !p.trim().is_empty())?;

    // Unparsed originals stay in place so "next line" keeps its index meaning,
    // they are dropped when rendering
    let originals: Vec<Option<LyricLine>> = primary.lines().map(LyricLine::parse).collect();
    let mut attached: Vec<Vec<LyricLine>> = vec![Vec::new(); originals.len()];

    if include_translation {
        if let Some(translation) = source.translation.as_deref() {
            for raw in translation.lines() {
                let Some(translated) = LyricLine::parse(raw) else {
                    trace!("Skipping untimed translation line: {}", raw);
                    continue;
                };
                attach(&originals, &mut attached, translated);
            }
        }
    }

    let rendered: Vec<String> = originals
        .iter()
        .zip(&attached)
        .flat_map(|(original, extra)| original.iter().chain(extra.iter()))
        .map(LyricLine::render)
        .collect();

    if rendered.is_empty() {
        debug!("No timed lyric lines left after merging");
        return None;
    }
    Some(rendered.join("\n"))
}

fn attach(originals: &[Option<LyricLine>], attached: &mut [Vec<LyricLine>], translated: LyricLine) {
    // Scan backwards: the last original with this stamp wins
    let Some(index) = originals
        .iter()
        .rposition(|o| o.as_ref().is_some_and(|o| o.same_stamp(&translated)))
    else {
        trace!("No original line at [{}.{}]", translated.time, translated.fraction);
        return;
    };

    let wrapped = LyricLine {
        text: format!("({})", translated.text),
        ..translated
    };

    match originals.get(index + 1) {
        // Later insertions land directly after the original, ahead of earlier ones
        None => attached[index].insert(0, LyricLine::sentinel(wrapped.text)),
        Some(Some(next)) => attached[index].insert(0, wrapped.restamped(next)),
        // Keeps the original's stamp, so a later translation with the same
        // stamp follows it
        Some(None) => attached[index].push(wrapped),
    }
}
