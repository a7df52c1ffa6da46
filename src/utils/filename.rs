//! Output filename composition

use crate::metadata::CanonicalTags;

/// Longest stem we produce, in bytes, leaving room for an extension
const MAX_STEM_BYTES: usize = 200;

/// Make a string safe to use as a single path component
///
/// Reserved characters become visually similar Unicode lookalikes, control
/// characters are dropped, and trailing dots and spaces are trimmed since
/// Windows silently strips them.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' => '⧸',
            '\\' => '⧹',
            ':' => '꞉',
            '*' => '⁎',
            '?' => '？',
            '"' => '″',
            '<' => '‹',
            '>' => '›',
            '|' => '｜',
            _ => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches(['.', ' ']);
    truncate_on_char_boundary(trimmed, MAX_STEM_BYTES)
        .trim_end()
        .to_string()
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Render a `{artist}` / `{title}` / `{album}` template into a safe file stem
pub fn render_file_stem(template: &str, tags: &CanonicalTags) -> String {
    let rendered = template
        .replace("{artist}", &tags.artist)
        .replace("{title}", &tags.title)
        .replace("{album}", &tags.album);
    let stem = sanitize_filename(&rendered);
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}
