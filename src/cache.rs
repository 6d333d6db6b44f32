//! Local snapshot cache.
//!
//! The durable write-through target for every mutation, and the fallback
//! source when the remote store is unreachable at startup. Writes are
//! atomic (temp file + rename) and guarded by an advisory file lock so a
//! concurrent invocation never observes a partial snapshot.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::Snapshot;

/// How long to wait for the cache lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

const LOCK_RETRY_INTERVAL_MS: u64 = 50;

/// Storage for the persisted snapshot.
pub trait LocalCache: Send {
    /// Load the cached snapshot, or `None` when no cache exists yet.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Persist the snapshot, replacing any previous one.
    fn store(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Advisory lock on the cache file, released on drop.
struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    fn acquire(path: &Path, timeout_ms: u64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_INTERVAL_MS));
                }
                Err(_) => return Err(Error::LockFailed(path.to_path_buf())),
            }
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

/// File-backed cache holding one JSON snapshot.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Write atomically: temp file in the same directory, then rename.
    fn write_atomic(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl LocalCache for FileCache {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let _lock = CacheLock::acquire(&self.lock_path(), self.lock_timeout_ms)?;
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(Snapshot::from_json(&raw)?))
    }

    fn store(&mut self, snapshot: &Snapshot) -> Result<()> {
        let _lock = CacheLock::acquire(&self.lock_path(), self.lock_timeout_ms)?;
        self.write_atomic(snapshot.to_json()?.as_bytes())?;
        debug!(path = %self.path.display(), "snapshot cached");
        Ok(())
    }
}

/// In-memory cache for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    snapshot: Option<Snapshot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }
}

impl LocalCache for MemoryCache {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.clone())
    }

    fn store(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn snapshot() -> Snapshot {
        let state = AppState::new("north-it");
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        Snapshot::capture(&state, at)
    }

    #[test]
    fn missing_cache_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::new(temp.path().join("cache.json"));
        assert_eq!(cache.load().unwrap(), None);
    }

    #[test]
    fn store_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let mut cache = FileCache::new(temp.path().join("nested/dir/cache.json"));

        let snapshot = snapshot();
        cache.store(&snapshot).unwrap();
        assert_eq!(cache.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn store_replaces_previous_snapshot() {
        let temp = TempDir::new().unwrap();
        let mut cache = FileCache::new(temp.path().join("cache.json"));

        let first = snapshot();
        cache.store(&first).unwrap();

        let mut second = first.clone();
        second.current_fabric = Some("south-ot".to_string());
        cache.store(&second).unwrap();

        assert_eq!(cache.load().unwrap(), Some(second));
    }

    #[test]
    fn no_temp_or_lock_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let mut cache = FileCache::new(temp.path().join("cache.json"));
        cache.store(&snapshot()).unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cache.json"]);
    }

    #[test]
    fn memory_cache_round_trips() {
        let mut cache = MemoryCache::new();
        assert_eq!(cache.load().unwrap(), None);

        let snapshot = snapshot();
        cache.store(&snapshot).unwrap();
        assert_eq!(cache.load().unwrap(), Some(snapshot));
    }
}
