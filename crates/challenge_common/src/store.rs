//! Progress store.
//!
//! Persists the three progress facets (completed instance keys, total points,
//! streak) as independently keyed records:
//!
//! - `<prefix>completed-challenges`: JSON array of identity keys
//! - `<prefix>challenge-points`: base-10 integer
//! - `<prefix>challenge-streak`: base-10 integer
//!
//! Loading never fails. A missing or malformed facet falls back to its zero
//! value without affecting the other facets.

use crate::error::ChallengeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const COMPLETED_FACET: &str = "completed-challenges";
pub const POINTS_FACET: &str = "challenge-points";
pub const STREAK_FACET: &str = "challenge-streak";

// ============================================================================
// Backends
// ============================================================================

/// String key-value storage the progress facets are written to
pub trait KeyValueStore: Send + Sync {
    /// Read a record; `Ok(None)` when it does not exist
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace a record
    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Delete a record (no error if it does not exist)
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per record inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

/// Write data to a file atomically using temp file + rename
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        atomic_write(&self.path_for(key), value.as_bytes())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-memory backend, with switchable write failures for quota/denied tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    /// Only records whose name ends with this fail
    fail_suffix: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail until switched back off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail writes only to records whose name ends with `suffix`
    pub fn set_fail_record(&self, suffix: Option<&str>) {
        *self.fail_suffix.lock().unwrap_or_else(|e| e.into_inner()) = suffix.map(str::to_string);
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self, key: &str) -> io::Result<()> {
        let record_fails = self
            .fail_suffix
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_deref()
            .is_some_and(|suffix| key.ends_with(suffix));
        if record_fails || self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage quota exceeded",
            ));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.check_writable(key)?;
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.check_writable(key)?;
        self.entries().remove(key);
        Ok(())
    }
}

// ============================================================================
// Progress state
// ============================================================================

/// Persisted progress for one installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Identity keys of completed instances
    pub completed: BTreeSet<String>,
    pub total_points: u64,
    /// Completions ever recorded; never reset on a skipped day
    pub streak: u64,
}

impl ProgressState {
    pub fn is_completed(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

/// Reads and writes [`ProgressState`] through a [`KeyValueStore`]
#[derive(Clone)]
pub struct ProgressStore {
    backend: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl ProgressStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    /// Store backed by files in `dir`
    pub fn on_disk(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self::new(Arc::new(FileStore::new(dir)), prefix)
    }

    /// Store backed by memory only
    pub fn in_memory(prefix: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), prefix)
    }

    fn record_name(&self, facet: &str) -> String {
        format!("{}{}", self.prefix, facet)
    }

    /// Load progress, substituting zero values for absent or malformed facets
    pub fn load(&self) -> ProgressState {
        let completed = self
            .read_facet(COMPLETED_FACET, |raw| {
                serde_json::from_str::<Vec<String>>(raw)
                    .map(|keys| keys.into_iter().collect::<BTreeSet<_>>())
                    .map_err(|e| e.to_string())
            })
            .unwrap_or_default();
        let total_points = self.read_facet(POINTS_FACET, parse_counter).unwrap_or(0);
        let streak = self.read_facet(STREAK_FACET, parse_counter).unwrap_or(0);

        ProgressState {
            completed,
            total_points,
            streak,
        }
    }

    fn read_facet<T>(
        &self,
        facet: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        let name = self.record_name(facet);
        let raw = match self.backend.get(&name) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Progress record {} absent, using default", name);
                return None;
            }
            Err(e) => {
                warn!("Failed to read progress record {}: {}", name, e);
                return None;
            }
        };

        match parse(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Progress record {} is corrupt ({}), using default", name, e);
                None
            }
        }
    }

    /// Overwrite all three facets.
    ///
    /// Either every facet is replaced or, on error, the facets already
    /// written are put back to their previous values. The completed list is
    /// written first, so even a failed rollback can lose the last reward but
    /// never grant it twice.
    pub fn save(&self, state: &ProgressState) -> Result<(), ChallengeError> {
        let keys: Vec<&String> = state.completed.iter().collect();
        let completed = serde_json::to_string(&keys)?;

        self.replace_facets(&[
            (COMPLETED_FACET, Some(completed)),
            (POINTS_FACET, Some(state.total_points.to_string())),
            (STREAK_FACET, Some(state.streak.to_string())),
        ])?;

        debug!(
            "Saved progress: {} completed, {} points, streak {}",
            state.completed.len(),
            state.total_points,
            state.streak
        );
        Ok(())
    }

    /// Remove every facet, restoring the removed ones if any removal fails
    pub fn clear(&self) -> Result<(), ChallengeError> {
        self.replace_facets(&[
            (COMPLETED_FACET, None),
            (POINTS_FACET, None),
            (STREAK_FACET, None),
        ])
    }

    /// Apply facet writes in order (`None` removes); all or nothing
    fn replace_facets(&self, writes: &[(&str, Option<String>)]) -> Result<(), ChallengeError> {
        let mut previous = Vec::with_capacity(writes.len());
        for (facet, _) in writes {
            let name = self.record_name(facet);
            let old = self.backend.get(&name)?;
            previous.push((name, old));
        }

        for (index, ((name, _), (_, value))) in previous.iter().zip(writes).enumerate() {
            let written = match value {
                Some(value) => self.backend.set(name, value),
                None => self.backend.remove(name),
            };
            if let Err(e) = written {
                warn!("Write to {} failed, rolling back {} record(s)", name, index);
                self.restore(&previous[..index]);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn restore(&self, previous: &[(String, Option<String>)]) {
        for (name, old) in previous.iter().rev() {
            let restored = match old {
                Some(value) => self.backend.set(name, value),
                None => self.backend.remove(name),
            };
            if let Err(e) = restored {
                warn!("Failed to restore progress record {}: {}", name, e);
            }
        }
    }
}

fn parse_counter(raw: &str) -> Result<u64, String> {
    raw.trim().parse::<u64>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PREFIX: &str = "test-";

    fn sample_state() -> ProgressState {
        ProgressState {
            completed: ["a-Sat Oct 17 2026".to_string(), "b-Sun Oct 18 2026".to_string()]
                .into_iter()
                .collect(),
            total_points: 85,
            streak: 2,
        }
    }

    #[test]
    fn test_load_empty_store_defaults() {
        let store = ProgressStore::in_memory(PREFIX);
        assert_eq!(store.load(), ProgressState::default());
    }

    #[test]
    fn test_memory_roundtrip() {
        let store = ProgressStore::in_memory(PREFIX);
        store.save(&sample_state()).unwrap();
        assert_eq!(store.load(), sample_state());
    }

    #[test]
    fn test_record_layout() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        store.save(&sample_state()).unwrap();

        let completed = backend.get("test-completed-challenges").unwrap().unwrap();
        let keys: Vec<String> = serde_json::from_str(&completed).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(backend.get("test-challenge-points").unwrap().as_deref(), Some("85"));
        assert_eq!(backend.get("test-challenge-streak").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_corrupt_facet_is_isolated() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        store.save(&sample_state()).unwrap();

        backend.set("test-completed-challenges", "{not json").unwrap();
        let loaded = store.load();
        assert!(loaded.completed.is_empty());
        assert_eq!(loaded.total_points, 85);
        assert_eq!(loaded.streak, 2);

        backend.set("test-challenge-points", "lots").unwrap();
        backend.set("test-challenge-streak", "-3").unwrap();
        let loaded = store.load();
        assert_eq!(loaded.total_points, 0);
        assert_eq!(loaded.streak, 0);
    }

    #[test]
    fn test_duplicate_keys_collapse_on_load() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        backend
            .set("test-completed-challenges", r#"["x-Mon Oct 12 2026","x-Mon Oct 12 2026"]"#)
            .unwrap();
        assert_eq!(store.load().completed_count(), 1);
    }

    #[test]
    fn test_counter_tolerates_whitespace() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        backend.set("test-challenge-points", " 120\n").unwrap();
        assert_eq!(store.load().total_points, 120);
    }

    #[test]
    fn test_failed_write_reports_error() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        backend.set_fail_writes(true);
        assert!(matches!(store.save(&sample_state()), Err(ChallengeError::Io(_))));
        backend.set_fail_writes(false);
        assert_eq!(store.load(), ProgressState::default());
    }

    #[test]
    fn test_partial_save_failure_restores_previous_records() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        let before = ProgressState {
            completed: ["a-Fri Oct 16 2026".to_string()].into_iter().collect(),
            total_points: 40,
            streak: 1,
        };
        store.save(&before).unwrap();

        backend.set_fail_record(Some(POINTS_FACET));
        assert!(matches!(store.save(&sample_state()), Err(ChallengeError::Io(_))));
        backend.set_fail_record(None);
        assert_eq!(store.load(), before);

        // Streak is written last; its failure rolls back both earlier facets
        backend.set_fail_record(Some(STREAK_FACET));
        assert!(store.save(&sample_state()).is_err());
        backend.set_fail_record(None);
        assert_eq!(store.load(), before);
    }

    #[test]
    fn test_partial_save_failure_on_fresh_store_removes_records() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);

        backend.set_fail_record(Some(STREAK_FACET));
        assert!(store.save(&sample_state()).is_err());
        backend.set_fail_record(None);

        assert!(backend.get("test-completed-challenges").unwrap().is_none());
        assert!(backend.get("test-challenge-points").unwrap().is_none());
        assert_eq!(store.load(), ProgressState::default());
    }

    #[test]
    fn test_partial_clear_failure_restores_records() {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(backend.clone(), PREFIX);
        store.save(&sample_state()).unwrap();

        backend.set_fail_record(Some(STREAK_FACET));
        assert!(store.clear().is_err());
        backend.set_fail_record(None);
        assert_eq!(store.load(), sample_state());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::on_disk(dir.path(), PREFIX);
        store.save(&sample_state()).unwrap();

        // A fresh store over the same directory sees the same state
        let reopened = ProgressStore::on_disk(dir.path(), PREFIX);
        assert_eq!(reopened.load(), sample_state());
        assert!(dir.path().join("test-challenge-points").exists());
        assert!(!dir.path().join("test-challenge-points.tmp").exists());
    }

    #[test]
    fn test_file_store_missing_dir_defaults() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::on_disk(dir.path().join("never-created"), PREFIX);
        assert_eq!(store.load(), ProgressState::default());
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::on_disk(dir.path(), PREFIX);
        store.save(&sample_state()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), ProgressState::default());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_prefixes_are_independent() {
        let backend = Arc::new(MemoryStore::new());
        let first = ProgressStore::new(backend.clone(), "one-");
        let second = ProgressStore::new(backend, "two-");
        first.save(&sample_state()).unwrap();
        assert_eq!(second.load(), ProgressState::default());
    }
}
