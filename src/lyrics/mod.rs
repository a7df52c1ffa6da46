//! Synchronised lyric handling

pub mod line;
pub mod merge;

pub use merge::{merge, LyricSource};
