//! Remote store contract.
//!
//! The shared store holds one authoritative snapshot plus the appendable
//! task catalog. Transport errors surface as `Error::Remote`; callers in
//! the synchronizer treat them as "unreachable" and fall back to the local
//! cache rather than aborting. The shipped transport is a shared
//! directory (typically a network mount); `MemoryRemote` backs tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::{Catalog, Task};
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::state::{Category, KanbanLane};

/// What a fetch found on the remote.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The server holds a snapshot.
    Data(Snapshot),
    /// The server is reachable but has never been initialized.
    Empty,
}

/// The shared snapshot server.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the authoritative snapshot.
    async fn fetch_all(&self) -> Result<FetchOutcome>;

    /// Seed an uninitialized server with a first snapshot.
    async fn initialize(&self, snapshot: &Snapshot) -> Result<()>;

    /// Replace the authoritative snapshot wholesale.
    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()>;

    /// Update one task's completion flag and date in place. The two move
    /// together so no reader ever sees them out of sync.
    async fn patch_task_state(
        &self,
        fabric_id: &str,
        task_id: &str,
        checked: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Update one task's notes in place.
    async fn patch_task_notes(&self, fabric_id: &str, task_id: &str, notes: &str) -> Result<()>;

    /// Update one task's priority category in place.
    async fn patch_task_category(
        &self,
        fabric_id: &str,
        task_id: &str,
        category: Category,
    ) -> Result<()>;

    /// Update one task's kanban lane in place.
    async fn patch_task_kanban(
        &self,
        fabric_id: &str,
        task_id: &str,
        lane: KanbanLane,
    ) -> Result<()>;

    /// Append a task to the shared catalog.
    async fn append_task(
        &self,
        section_id: &str,
        subsection_title: &str,
        task: &Task,
    ) -> Result<()>;

    /// Append an empty subsection to the shared catalog.
    async fn append_subsection(&self, section_id: &str, title: &str) -> Result<()>;
}

/// Remote store over a shared directory. The snapshot lives in
/// `snapshot.json`, the shared catalog in `catalog.json`. An
/// inaccessible directory reads as unreachable, not as empty.
#[derive(Debug, Clone)]
pub struct FileRemote {
    dir: PathBuf,
}

impl FileRemote {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join("snapshot.json")
    }

    fn catalog_path(&self) -> PathBuf {
        self.dir.join("catalog.json")
    }

    fn check_reachable(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(Error::Remote(format!(
                "shared directory not accessible: {}",
                self.dir.display()
            )))
        }
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let temp = self.snapshot_path().with_extension("tmp");
        std::fs::write(&temp, snapshot.to_json()?)?;
        std::fs::rename(&temp, self.snapshot_path())?;
        Ok(())
    }

    fn patch_snapshot<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Snapshot),
    {
        self.check_reachable()?;
        let path = self.snapshot_path();
        if !path.exists() {
            return Err(Error::Remote(
                "cannot patch an uninitialized remote snapshot".to_string(),
            ));
        }
        let mut snapshot = Snapshot::from_json(&std::fs::read_to_string(&path)?)?;
        mutate(&mut snapshot);
        self.write_snapshot(&snapshot)
    }

    fn update_catalog<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Catalog) -> Result<()>,
    {
        let path = self.catalog_path();
        let mut catalog = if path.exists() {
            Catalog::load(&path)?
        } else {
            Catalog::default()
        };
        mutate(&mut catalog)?;
        catalog.save(&path)
    }
}

#[async_trait]
impl RemoteStore for FileRemote {
    async fn fetch_all(&self) -> Result<FetchOutcome> {
        self.check_reachable()?;
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(FetchOutcome::Empty);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(FetchOutcome::Data(Snapshot::from_json(&raw)?))
    }

    async fn initialize(&self, snapshot: &Snapshot) -> Result<()> {
        self.check_reachable()?;
        if self.snapshot_path().exists() {
            return Ok(());
        }
        self.write_snapshot(snapshot)
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()> {
        self.check_reachable()?;
        self.write_snapshot(snapshot)
    }

    async fn patch_task_state(
        &self,
        fabric_id: &str,
        task_id: &str,
        checked: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.patch_snapshot(|snapshot| {
            snapshot
                .fabric_states
                .entry(fabric_id.to_string())
                .or_default()
                .insert(task_id.to_string(), checked);
            let dates = snapshot
                .fabric_completion_dates
                .entry(fabric_id.to_string())
                .or_default();
            match completed_at {
                Some(at) => {
                    dates.insert(task_id.to_string(), at);
                }
                None => {
                    dates.remove(task_id);
                }
            }
        })
    }

    async fn patch_task_notes(&self, fabric_id: &str, task_id: &str, notes: &str) -> Result<()> {
        self.patch_snapshot(|snapshot| {
            snapshot
                .fabric_notes
                .entry(fabric_id.to_string())
                .or_default()
                .insert(task_id.to_string(), notes.to_string());
        })
    }

    async fn patch_task_category(
        &self,
        fabric_id: &str,
        task_id: &str,
        category: Category,
    ) -> Result<()> {
        self.patch_snapshot(|snapshot| {
            snapshot
                .task_categories
                .entry(fabric_id.to_string())
                .or_default()
                .insert(task_id.to_string(), category);
        })
    }

    async fn patch_task_kanban(
        &self,
        fabric_id: &str,
        task_id: &str,
        lane: KanbanLane,
    ) -> Result<()> {
        self.patch_snapshot(|snapshot| {
            snapshot
                .task_kanban_status
                .entry(fabric_id.to_string())
                .or_default()
                .insert(task_id.to_string(), lane);
        })
    }

    async fn append_task(
        &self,
        section_id: &str,
        subsection_title: &str,
        task: &Task,
    ) -> Result<()> {
        self.check_reachable()?;
        self.update_catalog(|catalog| {
            catalog.add_task(section_id, subsection_title, task.clone())?;
            Ok(())
        })
    }

    async fn append_subsection(&self, section_id: &str, title: &str) -> Result<()> {
        self.check_reachable()?;
        self.update_catalog(|catalog| catalog.add_subsection(section_id, title))
    }
}

#[derive(Debug, Default)]
struct MemoryRemoteInner {
    snapshot: Option<Snapshot>,
    reachable: bool,
    writes_rejected: bool,
    replace_count: usize,
    patches: Vec<(String, String, String)>,
    appended_tasks: Vec<(String, String, Task)>,
    appended_subsections: Vec<(String, String)>,
}

/// In-memory remote for tests. Reachability is a toggle so tests can
/// exercise the unreachable and reconnect paths.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    inner: Arc<Mutex<MemoryRemoteInner>>,
}

impl MemoryRemote {
    /// A reachable, uninitialized remote.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryRemoteInner {
                reachable: true,
                ..MemoryRemoteInner::default()
            })),
        }
    }

    /// A reachable remote already holding a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let remote = Self::empty();
        remote.inner.lock().unwrap().snapshot = Some(snapshot);
        remote
    }

    /// A remote that fails every call until `set_reachable(true)`.
    pub fn unreachable() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryRemoteInner::default())),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().unwrap().reachable = reachable;
    }

    /// Make every write call fail while reads keep working.
    pub fn set_writes_rejected(&self, rejected: bool) {
        self.inner.lock().unwrap().writes_rejected = rejected;
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.inner.lock().unwrap().snapshot.clone()
    }

    pub fn replace_count(&self) -> usize {
        self.inner.lock().unwrap().replace_count
    }

    /// Recorded field patches as (field, fabric id, task id).
    pub fn patches(&self) -> Vec<(String, String, String)> {
        self.inner.lock().unwrap().patches.clone()
    }

    pub fn appended_tasks(&self) -> Vec<(String, String, Task)> {
        self.inner.lock().unwrap().appended_tasks.clone()
    }

    pub fn appended_subsections(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().appended_subsections.clone()
    }

    fn check_reachable(inner: &MemoryRemoteInner) -> Result<()> {
        if inner.reachable {
            Ok(())
        } else {
            Err(Error::Remote("connection refused".to_string()))
        }
    }

    fn check_writable(inner: &MemoryRemoteInner) -> Result<()> {
        Self::check_reachable(inner)?;
        if inner.writes_rejected {
            Err(Error::Remote("write rejected".to_string()))
        } else {
            Ok(())
        }
    }

    fn patch_target(inner: &mut MemoryRemoteInner) -> Result<&mut Snapshot> {
        Self::check_writable(inner)?;
        inner
            .snapshot
            .as_mut()
            .ok_or_else(|| Error::Remote("cannot patch an uninitialized remote".to_string()))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_all(&self) -> Result<FetchOutcome> {
        let inner = self.inner.lock().unwrap();
        Self::check_reachable(&inner)?;
        Ok(match &inner.snapshot {
            Some(snapshot) => FetchOutcome::Data(snapshot.clone()),
            None => FetchOutcome::Empty,
        })
    }

    async fn initialize(&self, snapshot: &Snapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_writable(&inner)?;
        if inner.snapshot.is_none() {
            inner.snapshot = Some(snapshot.clone());
        }
        Ok(())
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_writable(&inner)?;
        inner.snapshot = Some(snapshot.clone());
        inner.replace_count += 1;
        Ok(())
    }

    async fn patch_task_state(
        &self,
        fabric_id: &str,
        task_id: &str,
        checked: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = Self::patch_target(&mut inner)?;
        snapshot
            .fabric_states
            .entry(fabric_id.to_string())
            .or_default()
            .insert(task_id.to_string(), checked);
        let dates = snapshot
            .fabric_completion_dates
            .entry(fabric_id.to_string())
            .or_default();
        match completed_at {
            Some(at) => {
                dates.insert(task_id.to_string(), at);
            }
            None => {
                dates.remove(task_id);
            }
        }
        inner
            .patches
            .push(("state".into(), fabric_id.into(), task_id.into()));
        Ok(())
    }

    async fn patch_task_notes(&self, fabric_id: &str, task_id: &str, notes: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = Self::patch_target(&mut inner)?;
        snapshot
            .fabric_notes
            .entry(fabric_id.to_string())
            .or_default()
            .insert(task_id.to_string(), notes.to_string());
        inner
            .patches
            .push(("notes".into(), fabric_id.into(), task_id.into()));
        Ok(())
    }

    async fn patch_task_category(
        &self,
        fabric_id: &str,
        task_id: &str,
        category: Category,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = Self::patch_target(&mut inner)?;
        snapshot
            .task_categories
            .entry(fabric_id.to_string())
            .or_default()
            .insert(task_id.to_string(), category);
        inner
            .patches
            .push(("category".into(), fabric_id.into(), task_id.into()));
        Ok(())
    }

    async fn patch_task_kanban(
        &self,
        fabric_id: &str,
        task_id: &str,
        lane: KanbanLane,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = Self::patch_target(&mut inner)?;
        snapshot
            .task_kanban_status
            .entry(fabric_id.to_string())
            .or_default()
            .insert(task_id.to_string(), lane);
        inner
            .patches
            .push(("kanban".into(), fabric_id.into(), task_id.into()));
        Ok(())
    }

    async fn append_task(
        &self,
        section_id: &str,
        subsection_title: &str,
        task: &Task,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_reachable(&inner)?;
        inner.appended_tasks.push((
            section_id.to_string(),
            subsection_title.to_string(),
            task.clone(),
        ));
        Ok(())
    }

    async fn append_subsection(&self, section_id: &str, title: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_reachable(&inner)?;
        inner
            .appended_subsections
            .push((section_id.to_string(), title.to_string()));
        Ok(())
    }
}
