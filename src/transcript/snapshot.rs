//! Periodic session snapshots for crash/refresh recovery.
//!
//! The snapshot is the structured export plus a wall-clock stamp, written to a
//! small key-value store. A malformed snapshot is a data error: logged and
//! treated as "no snapshot", never propagated into the running session.

use crate::error::{ConfabError, Result};
use crate::report::Reporter;
use crate::transcript::store::UtteranceStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key the structured transcript snapshot is written under.
pub const TRANSCRIPT_KEY: &str = "confab_autosave";
/// Key the wall-clock save stamp is written under.
pub const SAVED_AT_KEY: &str = "confab_autosave_time";

/// Trait for the collaborator key-value store snapshots are written to.
pub trait SnapshotStore: Send + Sync {
    /// Writes `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Reads the value under `key`, if present.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Removes the value under `key`, if present.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory snapshot store for tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// File-backed snapshot store: one file per key under a directory.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Creates a store under the user data directory (`~/.local/share/confab`).
    pub fn default_location() -> Result<Self> {
        let dir = dirs::data_dir().ok_or_else(|| ConfabError::Snapshot {
            message: "could not determine data directory".to_string(),
        })?;
        Self::new(dir.join("confab"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes the structured export and a wall-clock stamp to the snapshot store.
pub fn save_snapshot(
    store: &UtteranceStore,
    snapshots: &dyn SnapshotStore,
    saved_at: DateTime<Utc>,
) -> Result<()> {
    let document = store.export_structured_at(saved_at)?;
    snapshots.save(TRANSCRIPT_KEY, &document)?;
    snapshots.save(SAVED_AT_KEY, &saved_at.to_rfc3339())?;
    Ok(())
}

/// Restores the last auto-saved transcript, if a readable one exists.
///
/// Missing or malformed snapshots are reported and treated as absent.
pub fn restore_snapshot(
    snapshots: &dyn SnapshotStore,
    reporter: &dyn Reporter,
) -> Option<UtteranceStore> {
    let document = match snapshots.load(TRANSCRIPT_KEY) {
        Ok(Some(document)) => document,
        Ok(None) => return None,
        Err(e) => {
            reporter.report("snapshot", &format!("failed to read snapshot: {}", e));
            return None;
        }
    };

    match UtteranceStore::import_structured(&document) {
        Ok(store) => Some(store),
        Err(e) => {
            reporter.report("snapshot", &format!("discarding malformed snapshot: {}", e));
            None
        }
    }
}

/// Wall-clock time of the last auto-save, if recorded.
pub fn last_saved_at(snapshots: &dyn SnapshotStore) -> Option<DateTime<Utc>> {
    let stamp = snapshots.load(SAVED_AT_KEY).ok().flatten()?;
    DateTime::parse_from_rfc3339(&stamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;
    use crate::transcript::store::Utterance;

    fn sample_store() -> UtteranceStore {
        let mut store = UtteranceStore::new("en-US");
        store.append(Utterance::finalized(0, "hello", 0, 0.9));
        store.append(Utterance::finalized(0, "world", 1000, 0.9));
        store
    }

    #[test]
    fn test_memory_store_round_trip() {
        let snapshots = MemorySnapshotStore::new();
        snapshots.save("k", "v").unwrap();
        assert_eq!(snapshots.load("k").unwrap().as_deref(), Some("v"));

        snapshots.remove("k").unwrap();
        assert_eq!(snapshots.load("k").unwrap(), None);
    }

    #[test]
    fn test_save_and_restore_snapshot() {
        let snapshots = MemorySnapshotStore::new();
        let saved_at = Utc::now();
        save_snapshot(&sample_store(), &snapshots, saved_at).unwrap();

        let restored = restore_snapshot(&snapshots, &NullReporter).expect("snapshot present");
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.utterances()[1].text, "world");

        let stamp = last_saved_at(&snapshots).expect("stamp present");
        assert_eq!(stamp, saved_at);
    }

    #[test]
    fn test_restore_missing_snapshot() {
        let snapshots = MemorySnapshotStore::new();
        assert!(restore_snapshot(&snapshots, &NullReporter).is_none());
    }

    #[test]
    fn test_restore_malformed_snapshot_is_absent() {
        let snapshots = MemorySnapshotStore::new();
        snapshots.save(TRANSCRIPT_KEY, "{definitely not json").unwrap();
        assert!(restore_snapshot(&snapshots, &NullReporter).is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();

        save_snapshot(&sample_store(), &snapshots, Utc::now()).unwrap();
        let restored = restore_snapshot(&snapshots, &NullReporter).expect("snapshot present");
        assert_eq!(restored.len(), 2);

        snapshots.remove(TRANSCRIPT_KEY).unwrap();
        assert!(restore_snapshot(&snapshots, &NullReporter).is_none());
        // Removing again is fine.
        snapshots.remove(TRANSCRIPT_KEY).unwrap();
    }
}
