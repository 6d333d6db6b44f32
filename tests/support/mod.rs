use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use fabtrack::snapshot::Snapshot;
use tempfile::TempDir;

/// A throwaway working directory for one test, with helpers for the
/// files fabtrack reads and writes there.
pub struct TestDir {
    dir: TempDir,
}

#[allow(dead_code)]
impl TestDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file("fabtrack.toml", contents)
    }

    /// A shared-directory remote under this workspace, created on first use.
    pub fn share_dir(&self) -> PathBuf {
        let path = self.dir.path().join("share");
        fs::create_dir_all(&path).expect("failed to create share dir");
        path
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.path().join("cache.json")
    }

    /// Parse the snapshot cache, if one has been written.
    pub fn read_cache(&self) -> Option<Snapshot> {
        let path = self.cache_path();
        if !path.exists() {
            return None;
        }
        let raw = fs::read_to_string(&path).expect("failed to read cache");
        Some(Snapshot::from_json(&raw).expect("failed to parse cache"))
    }

    /// A fabtrack invocation scoped to this directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("fabtrack").expect("binary");
        cmd.arg("--dir").arg(self.dir.path());
        cmd
    }
}
