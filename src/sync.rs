//! Dual-path persistence synchronizer.
//!
//! Every mutation writes through to the local cache immediately, and
//! single-field edits are patched onto the remote as they happen. The
//! remote store is additionally reconciled on a fixed interval, pushing
//! the full snapshot only when it differs from the last successful
//! push. A lost realtime connection is retried on a fixed delay with no
//! backoff.
//!
//! Startup resolution order:
//! 1. Remote holds data: it wins, the cache is overwritten.
//! 2. Remote reachable but uninitialized: the local cache (or the
//!    store's current state) seeds it.
//! 3. Remote unreachable: the local cache alone restores state.
//!
//! Until startup resolves, mutations update in-memory state but nothing
//! is persisted, so a half-loaded session can never clobber the cache.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::catalog::{ExecutionStatus, Task};
use crate::comment::User;
use crate::error::Result;
use crate::realtime::{apply_update, RealtimeChannel, RemoteUpdate};
use crate::remote::{FetchOutcome, RemoteStore};
use crate::snapshot::Snapshot;
use crate::state::{Category, KanbanLane};
use crate::store::Store;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// A mutation request, from the CLI or any other frontend.
#[derive(Debug, Clone)]
pub enum AppCommand {
    SetCurrentFabric {
        fabric_id: String,
    },
    SetTaskState {
        fabric_id: String,
        task_id: String,
        checked: bool,
    },
    SetTaskNotes {
        fabric_id: String,
        task_id: String,
        notes: String,
    },
    SetTaskCategory {
        fabric_id: String,
        task_id: String,
        category: Category,
    },
    SetTaskKanban {
        fabric_id: String,
        task_id: String,
        lane: KanbanLane,
    },
    SetTestCaseStatus {
        fabric_id: String,
        tc_id: String,
        status: ExecutionStatus,
    },
    SetTaskStateAcross {
        task_id: String,
        checked: bool,
        fabric_ids: Vec<String>,
    },
    SetTaskCategoryAcross {
        task_id: String,
        category: Category,
        fabric_ids: Vec<String>,
    },
    CloneTasksAcross {
        task_ids: Vec<String>,
        source_fabric_id: String,
        target_fabric_ids: Vec<String>,
    },
    SaveSubChecklist {
        name: String,
        task_ids: Vec<String>,
    },
    DeleteSubChecklist {
        name: String,
    },
    AddTask {
        section_id: String,
        subsection_title: String,
        task: Task,
    },
    AddSubsection {
        section_id: String,
        title: String,
    },
    UpsertUser {
        user: User,
    },
    AddComment {
        task_id: String,
        fabric_id: String,
        content: String,
        parent_comment_id: Option<String>,
    },
    MarkNotificationRead {
        notification_id: String,
    },
    ClearNotifications,
}

/// Owns the store and reconciles it against cache and remote.
pub struct Synchronizer<C: LocalCache, R: RemoteStore> {
    store: Store,
    cache: C,
    remote: R,
    sync_interval: Duration,
    reconnect_delay: Duration,
    /// Set once startup has resolved; persistence is suppressed before.
    loaded: bool,
    /// Serialized form of the last snapshot the remote accepted.
    last_pushed: Option<String>,
}

impl<C: LocalCache, R: RemoteStore> Synchronizer<C, R> {
    pub fn new(store: Store, cache: C, remote: R) -> Self {
        Self {
            store,
            cache,
            remote,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            loaded: false,
            last_pushed: None,
        }
    }

    pub fn with_intervals(mut self, sync_interval: Duration, reconnect_delay: Duration) -> Self {
        self.sync_interval = sync_interval;
        self.reconnect_delay = reconnect_delay;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Resolve startup state from remote and cache.
    ///
    /// Nothing here is fatal: a failed cache read starts fresh, a failed
    /// cache write or remote seed is logged and left to the next flush.
    /// Startup always resolves, so persistence is never wedged shut.
    pub async fn start(&mut self) -> Result<()> {
        match self.remote.fetch_all().await {
            Ok(FetchOutcome::Data(snapshot)) => {
                info!("remote snapshot loaded");
                self.store.load_snapshot(snapshot.clone());
                if let Err(err) = self.cache.store(&snapshot) {
                    warn!(%err, "cache write failed at startup");
                }
                self.last_pushed = Some(push_marker(&snapshot)?);
            }
            Ok(FetchOutcome::Empty) => {
                let seed = match self.cache.load() {
                    Ok(Some(cached)) => {
                        info!("remote uninitialized, seeding from local cache");
                        self.store.load_snapshot(cached.clone());
                        cached
                    }
                    Ok(None) => {
                        info!("remote uninitialized and no local cache, seeding fresh");
                        self.store.snapshot()
                    }
                    Err(err) => {
                        warn!(%err, "cache unreadable, seeding fresh");
                        self.store.snapshot()
                    }
                };
                // The marker only advances on a successful seed, so a
                // failed one is retried by the next interval flush.
                match self.remote.initialize(&seed).await {
                    Ok(()) => self.last_pushed = Some(push_marker(&seed)?),
                    Err(err) => warn!(%err, "remote seed failed, next flush retries"),
                }
                if let Err(err) = self.cache.store(&seed) {
                    warn!(%err, "cache write failed at startup");
                }
            }
            Err(err) => {
                warn!(%err, "remote unreachable, falling back to local cache");
                match self.cache.load() {
                    Ok(Some(cached)) => self.store.load_snapshot(cached),
                    Ok(None) => {}
                    Err(err) => warn!(%err, "cache unreadable, starting fresh"),
                }
            }
        }
        self.loaded = true;
        Ok(())
    }

    /// Apply one mutation and write through to the local cache. The four
    /// single-field edits are additionally patched onto the remote right
    /// away; a failed patch is logged and the interval push reconciles.
    pub async fn apply(&mut self, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::SetCurrentFabric { fabric_id } => {
                self.store.set_current_fabric(&fabric_id);
            }
            AppCommand::SetTaskState {
                fabric_id,
                task_id,
                checked,
            } => {
                self.store.set_task_state(&fabric_id, &task_id, checked);
                // A gated completion leaves the state untouched; only an
                // applied change reaches the remote.
                if self.loaded && self.store.state().task_checked(&fabric_id, &task_id) == checked {
                    let completed_at = self.store.state().completion_date(&fabric_id, &task_id);
                    if let Err(err) = self
                        .remote
                        .patch_task_state(&fabric_id, &task_id, checked, completed_at)
                        .await
                    {
                        warn!(%err, "remote patch_task_state failed, interval push reconciles");
                    }
                }
            }
            AppCommand::SetTaskNotes {
                fabric_id,
                task_id,
                notes,
            } => {
                self.store.set_task_notes(&fabric_id, &task_id, &notes);
                if self.loaded {
                    if let Err(err) = self
                        .remote
                        .patch_task_notes(&fabric_id, &task_id, &notes)
                        .await
                    {
                        warn!(%err, "remote patch_task_notes failed, interval push reconciles");
                    }
                }
            }
            AppCommand::SetTaskCategory {
                fabric_id,
                task_id,
                category,
            } => {
                self.store.set_task_category(&fabric_id, &task_id, category);
                if self.loaded {
                    if let Err(err) = self
                        .remote
                        .patch_task_category(&fabric_id, &task_id, category)
                        .await
                    {
                        warn!(%err, "remote patch_task_category failed, interval push reconciles");
                    }
                }
            }
            AppCommand::SetTaskKanban {
                fabric_id,
                task_id,
                lane,
            } => {
                self.store.set_task_kanban(&fabric_id, &task_id, lane);
                if self.loaded {
                    if let Err(err) = self
                        .remote
                        .patch_task_kanban(&fabric_id, &task_id, lane)
                        .await
                    {
                        warn!(%err, "remote patch_task_kanban failed, interval push reconciles");
                    }
                }
            }
            AppCommand::SetTestCaseStatus {
                fabric_id,
                tc_id,
                status,
            } => {
                self.store.set_test_case_status(&fabric_id, &tc_id, status);
            }
            AppCommand::SetTaskStateAcross {
                task_id,
                checked,
                fabric_ids,
            } => {
                self.store.set_task_state_across(&task_id, checked, &fabric_ids);
            }
            AppCommand::SetTaskCategoryAcross {
                task_id,
                category,
                fabric_ids,
            } => {
                self.store
                    .set_task_category_across(&task_id, category, &fabric_ids);
            }
            AppCommand::CloneTasksAcross {
                task_ids,
                source_fabric_id,
                target_fabric_ids,
            } => {
                self.store
                    .clone_tasks_across(&task_ids, &source_fabric_id, &target_fabric_ids);
            }
            AppCommand::SaveSubChecklist { name, task_ids } => {
                self.store.save_sub_checklist(&name, &task_ids)?;
            }
            AppCommand::DeleteSubChecklist { name } => {
                self.store.delete_sub_checklist(&name);
            }
            AppCommand::AddTask {
                section_id,
                subsection_title,
                task,
            } => {
                self.store
                    .add_task(&section_id, &subsection_title, task.clone())?;
                // Catalog appends go to the remote directly; a failure
                // leaves the local catalog ahead until the next session.
                if let Err(err) = self
                    .remote
                    .append_task(&section_id, &subsection_title, &task)
                    .await
                {
                    warn!(%err, "remote append_task failed");
                }
            }
            AppCommand::AddSubsection { section_id, title } => {
                self.store.add_subsection(&section_id, &title)?;
                if let Err(err) = self.remote.append_subsection(&section_id, &title).await {
                    warn!(%err, "remote append_subsection failed");
                }
            }
            AppCommand::UpsertUser { user } => {
                self.store.upsert_user(user);
            }
            AppCommand::AddComment {
                task_id,
                fabric_id,
                content,
                parent_comment_id,
            } => {
                self.store
                    .add_comment(&task_id, &fabric_id, &content, parent_comment_id)?;
            }
            AppCommand::MarkNotificationRead { notification_id } => {
                self.store.mark_notification_read(&notification_id);
            }
            AppCommand::ClearNotifications => {
                self.store.clear_notifications();
            }
        }
        if let Err(err) = self.write_through() {
            warn!(%err, "cache write-through failed");
        }
        Ok(())
    }

    /// Apply a broadcast update from another client.
    pub fn apply_remote(&mut self, update: &RemoteUpdate) {
        apply_update(&mut self.store, update);
        if let Err(err) = self.write_through() {
            warn!(%err, "write-through after remote update failed");
        }
    }

    /// Push the snapshot to the remote if it changed since the last
    /// successful push. Returns whether a push happened. The marker is
    /// only advanced on success, so a failed push retries next interval.
    pub async fn flush(&mut self) -> Result<bool> {
        let snapshot = self.store.snapshot();
        let marker = push_marker(&snapshot)?;
        if self.last_pushed.as_deref() == Some(marker.as_str()) {
            debug!("no changes since last push");
            return Ok(false);
        }
        self.remote.replace_all(&snapshot).await?;
        self.last_pushed = Some(marker);
        Ok(true)
    }

    /// One-shot reconciliation for a frontend that has already applied
    /// its mutations: prime the change marker from the remote's current
    /// data, then push only when the local state differs. The remote-wins
    /// rule in `start` is for session startup; a push afterwards must not
    /// discard the session's accumulated edits.
    pub async fn push_session(&mut self) -> Result<bool> {
        match self.remote.fetch_all().await? {
            FetchOutcome::Data(current) => {
                self.last_pushed = Some(push_marker(&current)?);
            }
            FetchOutcome::Empty => {
                self.last_pushed = None;
            }
        }
        self.loaded = true;
        self.flush().await
    }

    fn write_through(&mut self) -> Result<()> {
        if !self.loaded {
            debug!("startup unresolved, skipping persistence");
            return Ok(());
        }
        self.cache.store(&self.store.snapshot())
    }

    /// Run the sync session: commands in, interval pushes out, realtime
    /// updates applied as they arrive. Returns when the command channel
    /// closes, after a final flush.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<AppCommand>,
        mut channel: Box<dyn RealtimeChannel>,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(self.sync_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it.
        interval.tick().await;

        let mut connected = channel.connect().await.is_ok();
        if !connected {
            warn!("realtime connect failed, will retry");
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.flush().await {
                        warn!(%err, "interval push failed, will retry");
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if let Err(err) = self.apply(command).await {
                                warn!(%err, "command rejected");
                            }
                        }
                        None => break,
                    }
                }
                update = channel.next_update(), if connected => {
                    match update {
                        Ok(Some(update)) => self.apply_remote(&update),
                        Ok(None) | Err(_) => {
                            warn!("realtime connection lost");
                            connected = false;
                        }
                    }
                }
                _ = tokio::time::sleep(self.reconnect_delay), if !connected => {
                    connected = channel.connect().await.is_ok();
                    if connected {
                        info!("realtime reconnected");
                    }
                }
            }
        }

        if let Err(err) = self.flush().await {
            warn!(%err, "final push failed");
        }
        Ok(())
    }
}

/// Serialized comparison form: the save timestamp is cleared so that
/// re-capturing an unchanged state never looks like a new change.
fn push_marker(snapshot: &Snapshot) -> Result<String> {
    let mut comparable = snapshot.clone();
    comparable.last_saved = None;
    comparable.to_json()
}
