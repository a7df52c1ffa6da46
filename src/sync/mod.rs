//! Playlist sync: ledger, per-track pipeline, and the download queue

pub mod downloader;
pub mod ledger;
pub mod pipeline;
pub mod queue;
pub mod storage;

#[cfg(test)]
mod fake;

pub use ledger::SyncLedger;
pub use queue::{DownloadQueue, QueueConfig, QueueEvent, QueueReport};
