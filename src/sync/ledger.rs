//! Persisted record of tracks already synced

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::netease::TrackId;

const LEDGER_FILE: &str = "playlist.json";

/// Tracks that are downloaded or permanently skipped, newest first
///
/// Stored as a bare JSON array of IDs and rewritten whole on each commit.
/// Single writer only.
#[derive(Debug, Clone)]
pub struct SyncLedger {
    path: PathBuf,
    synced: Vec<TrackId>,
}

impl SyncLedger {
    /// Ledger file location inside a data directory
    pub fn file_in(data_dir: &Path) -> PathBuf {
        data_dir.join(LEDGER_FILE)
    }

    /// Load the ledger from the data directory, creating `[]` if absent
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::file_in(data_dir);

        if !path.exists() {
            warn!("Ledger {} not found, creating an empty one", path.display());
            std::fs::write(&path, "[]").context("Failed to create ledger file")?;
        }

        let content = std::fs::read_to_string(&path).context("Failed to read ledger file")?;
        let synced: Vec<TrackId> =
            serde_json::from_str(&content).context("Failed to parse ledger file")?;

        debug!("Loaded ledger: {} synced tracks", synced.len());
        Ok(Self { path, synced })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn synced(&self) -> &[TrackId] {
        &self.synced
    }

    pub fn len(&self) -> usize {
        self.synced.len()
    }

    /// Remote IDs not yet in the ledger
    pub fn diff(&self, remote: &[TrackId]) -> Vec<TrackId> {
        diff(remote, &self.synced)
    }

    /// Prepend newly synced IDs and write the ledger back
    ///
    /// IDs already present are not added again. Returns how many were added.
    pub fn commit(&mut self, newly_synced: &[TrackId]) -> Result<usize> {
        let mut seen: HashSet<TrackId> = self.synced.iter().copied().collect();
        let fresh: Vec<TrackId> = newly_synced
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        let added = fresh.len();

        self.synced.splice(0..0, fresh);
        self.save()?;

        debug!("Committed {} new IDs, ledger now holds {}", added, self.synced.len());
        Ok(added)
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string(&self.synced).context("Failed to serialize ledger")?;
        std::fs::write(&self.path, content).context("Failed to write ledger file")?;
        Ok(())
    }
}

/// Set difference `remote - local`, keeping remote order and remote duplicates
pub fn diff(remote: &[TrackId], local: &[TrackId]) -> Vec<TrackId> {
    let local: HashSet<TrackId> = local.iter().copied().collect();
    remote
        .iter()
        .copied()
        .filter(|id| !local.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<TrackId> {
        raw.iter().copied().map(TrackId).collect()
    }

    #[test]
    fn test_diff_excludes_local_and_keeps_order() {
        let remote = ids(&[5, 1, 4, 2, 3]);
        let local = ids(&[2, 5]);
        assert_eq!(diff(&remote, &local), ids(&[1, 4, 3]));
    }

    #[test]
    fn test_diff_is_idempotent() {
        let remote = ids(&[9, 8, 7]);
        let local = ids(&[8]);
        assert_eq!(diff(&remote, &local), diff(&remote, &local));
        assert_eq!(diff(&diff(&remote, &local), &local), diff(&remote, &local));
    }

    #[test]
    fn test_diff_keeps_remote_duplicates() {
        assert_eq!(diff(&ids(&[1, 1, 2]), &ids(&[2])), ids(&[1, 1]));
    }

    #[test]
    fn test_load_creates_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SyncLedger::load(dir.path()).unwrap();
        assert_eq!(ledger.len(), 0);
        assert_eq!(std::fs::read_to_string(dir.path().join(LEDGER_FILE)).unwrap(), "[]");
    }

    #[test]
    fn test_commit_prepends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), "[10,11]").unwrap();

        let mut ledger = SyncLedger::load(dir.path()).unwrap();
        assert_eq!(ledger.commit(&ids(&[3, 2])).unwrap(), 2);
        assert_eq!(ledger.synced(), ids(&[3, 2, 10, 11]).as_slice());

        let reloaded = SyncLedger::load(dir.path()).unwrap();
        assert_eq!(reloaded.synced(), ids(&[3, 2, 10, 11]).as_slice());
    }

    #[test]
    fn test_commit_skips_known_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = SyncLedger::load(dir.path()).unwrap();
        ledger.commit(&ids(&[1, 2])).unwrap();
        assert_eq!(ledger.commit(&ids(&[2, 3, 3])).unwrap(), 1);
        assert_eq!(ledger.synced(), ids(&[3, 1, 2]).as_slice());
    }

    #[test]
    fn test_commit_then_diff_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let remote = ids(&[4, 5, 6]);

        let mut ledger = SyncLedger::load(dir.path()).unwrap();
        let pending = ledger.diff(&remote);
        ledger.commit(&pending).unwrap();

        assert!(ledger.diff(&remote).is_empty());
        assert!(SyncLedger::load(dir.path()).unwrap().diff(&remote).is_empty());
    }

    #[test]
    fn test_legacy_duplicates_accepted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), "[1,1,2]").unwrap();
        let ledger = SyncLedger::load(dir.path()).unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger.diff(&ids(&[1, 2, 3])) == ids(&[3]));
    }
}
