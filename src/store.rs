//! The state store: sole owner and mutator of application state.
//!
//! Wraps the pure reducer with boundary validation, the dependency gate on
//! task completion, and the timestamp couplings the reducer keeps as
//! separate transitions (completion flag + completion date, notes + note
//! modification date). Remote-origin updates go through the same public
//! operations as local edits, so invariant enforcement is identical
//! regardless of origin.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::catalog::{Catalog, ExecutionStatus, Task};
use crate::comment::{notifications_for, TaskComment, User};
use crate::deps::{self, PrerequisiteStatus};
use crate::error::{Error, Result};
use crate::fabric::Fabric;
use crate::progress::{
    completed_tasks, fabric_progress, tasks_for_fabric, weekly_report, CompletedTask,
    FabricProgress, TaskView, WeeklyReport,
};
use crate::snapshot::Snapshot;
use crate::state::{reduce, Action, AppState, Category, KanbanLane, SubChecklist, SubChecklistItem};

/// Owner of the canonical application state.
pub struct Store {
    state: AppState,
    catalog: Catalog,
    fabrics: Vec<Fabric>,
    /// Bumped on every applied action; lets callers detect mutation cheaply.
    revision: u64,
}

impl Store {
    pub fn new(catalog: Catalog, fabrics: Vec<Fabric>, current_fabric: impl Into<String>) -> Self {
        Self {
            state: AppState::new(current_fabric),
            catalog,
            fabrics,
            revision: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn fabrics(&self) -> &[Fabric] {
        &self.fabrics
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn current_fabric(&self) -> &str {
        &self.state.current_fabric
    }

    fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, &action);
        self.revision += 1;
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    pub fn set_current_fabric(&mut self, fabric_id: &str) {
        self.dispatch(Action::SetCurrentFabric {
            fabric_id: fabric_id.to_string(),
        });
    }

    /// Set a task's completion flag, gated on prerequisite test cases.
    ///
    /// Completion flag and completion date are applied as one unit and are
    /// never observable out of sync. A repeat of the current value is a
    /// full no-op: the completion date is not re-stamped on true -> true.
    /// An attempt to complete a task with unmet prerequisites is logged
    /// and leaves the state unchanged; it is not an error.
    pub fn set_task_state(&mut self, fabric_id: &str, task_id: &str, checked: bool) {
        self.set_task_state_at(fabric_id, task_id, checked, Utc::now());
    }

    pub fn set_task_state_at(
        &mut self,
        fabric_id: &str,
        task_id: &str,
        checked: bool,
        at: DateTime<Utc>,
    ) {
        if self.state.task_checked(fabric_id, task_id) == checked {
            debug!(%fabric_id, %task_id, checked, "task state unchanged, skipping");
            return;
        }
        if checked && !deps::can_complete(&self.state, &self.catalog, fabric_id, task_id) {
            warn!(%fabric_id, %task_id, "completion blocked by unmet prerequisites");
            return;
        }
        self.dispatch(Action::SetTaskState {
            fabric_id: fabric_id.to_string(),
            task_id: task_id.to_string(),
            checked,
        });
        self.dispatch(Action::SetTaskCompletionDate {
            fabric_id: fabric_id.to_string(),
            task_id: task_id.to_string(),
            checked,
            at,
        });
    }

    /// Set a task's notes, stamping the note-modification date when the
    /// resulting text is non-empty.
    pub fn set_task_notes(&mut self, fabric_id: &str, task_id: &str, notes: &str) {
        self.set_task_notes_at(fabric_id, task_id, notes, Utc::now());
    }

    pub fn set_task_notes_at(
        &mut self,
        fabric_id: &str,
        task_id: &str,
        notes: &str,
        at: DateTime<Utc>,
    ) {
        self.dispatch(Action::SetTaskNotes {
            fabric_id: fabric_id.to_string(),
            task_id: task_id.to_string(),
            notes: notes.to_string(),
        });
        if !notes.is_empty() {
            self.dispatch(Action::SetNoteModificationDate {
                fabric_id: fabric_id.to_string(),
                task_id: task_id.to_string(),
                at,
            });
        }
    }

    pub fn set_task_category(&mut self, fabric_id: &str, task_id: &str, category: Category) {
        self.dispatch(Action::SetTaskCategory {
            fabric_id: fabric_id.to_string(),
            task_id: task_id.to_string(),
            category,
        });
    }

    pub fn set_task_kanban(&mut self, fabric_id: &str, task_id: &str, lane: KanbanLane) {
        self.dispatch(Action::SetTaskKanban {
            fabric_id: fabric_id.to_string(),
            task_id: task_id.to_string(),
            lane,
        });
    }

    pub fn set_test_case_status(&mut self, fabric_id: &str, tc_id: &str, status: ExecutionStatus) {
        self.dispatch(Action::SetTestCaseStatus {
            fabric_id: fabric_id.to_string(),
            tc_id: tc_id.to_string(),
            status,
        });
    }

    // =========================================================================
    // Bulk operations: each target fabric independent, best-effort
    // =========================================================================

    pub fn set_task_state_across(&mut self, task_id: &str, checked: bool, fabric_ids: &[String]) {
        let at = Utc::now();
        for fabric_id in fabric_ids {
            self.set_task_state_at(fabric_id, task_id, checked, at);
        }
    }

    pub fn set_task_category_across(
        &mut self,
        task_id: &str,
        category: Category,
        fabric_ids: &[String],
    ) {
        for fabric_id in fabric_ids {
            self.set_task_category(fabric_id, task_id, category);
        }
    }

    /// Copy overlay state for the given tasks from a source fabric onto
    /// target fabrics. Unknown task ids are logged and skipped; a failure
    /// on one target never prevents attempts on the others.
    pub fn clone_tasks_across(
        &mut self,
        task_ids: &[String],
        source_fabric_id: &str,
        target_fabric_ids: &[String],
    ) {
        for task_id in task_ids {
            if self.catalog.find_task(task_id).is_none() {
                warn!(%task_id, "clone_tasks_across: unknown task, skipping");
                continue;
            }
            let checked = self.state.task_checked(source_fabric_id, task_id);
            let notes = self.state.task_notes(source_fabric_id, task_id).to_string();
            let completed_at = self.state.completion_date(source_fabric_id, task_id);
            let category = self.state.task_category(source_fabric_id, task_id);
            let lane = self.state.task_kanban(source_fabric_id, task_id);

            for fabric_id in target_fabric_ids {
                if fabric_id == source_fabric_id {
                    continue;
                }
                let at = completed_at.unwrap_or_else(Utc::now);
                self.set_task_state_at(fabric_id, task_id, checked, at);
                if !notes.is_empty() {
                    self.set_task_notes(fabric_id, task_id, &notes);
                }
                self.set_task_category(fabric_id, task_id, category);
                self.set_task_kanban(fabric_id, task_id, lane);
            }
        }
    }

    // =========================================================================
    // Sub-checklists
    // =========================================================================

    /// Create a sub-checklist from the given task ids, snapshotting their
    /// current state on the active fabric. Validation failures are the
    /// only user-surfaced error class.
    pub fn save_sub_checklist(&mut self, name: &str, task_ids: &[String]) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "sub-checklist name cannot be empty".to_string(),
            ));
        }
        if task_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "sub-checklist needs at least one task".to_string(),
            ));
        }

        let fabric_id = self.state.current_fabric.clone();
        let items: Vec<SubChecklistItem> = task_ids
            .iter()
            .filter_map(|task_id| {
                let Some(task) = self.catalog.find_task(task_id) else {
                    warn!(%task_id, "save_sub_checklist: unknown task, skipping");
                    return None;
                };
                Some(SubChecklistItem {
                    id: task.id.clone(),
                    text: task.text.clone(),
                    checked: self.state.task_checked(&fabric_id, task_id),
                    notes: self.state.task_notes(&fabric_id, task_id).to_string(),
                    test_case: task.test_case.clone(),
                })
            })
            .collect();

        if items.is_empty() {
            return Err(Error::InvalidArgument(
                "sub-checklist has no known tasks".to_string(),
            ));
        }

        let now = Utc::now();
        self.dispatch(Action::SaveSubChecklist {
            checklist: SubChecklist {
                name: name.to_string(),
                items,
                fabric_id,
                created_date: now,
                last_modified: now,
            },
        });
        Ok(())
    }

    pub fn delete_sub_checklist(&mut self, name: &str) {
        self.dispatch(Action::DeleteSubChecklist {
            name: name.to_string(),
        });
    }

    // =========================================================================
    // Catalog appends
    // =========================================================================

    /// Append a task to the catalog. The id is derived from the text by
    /// the same hash as static tasks, so identical text collides.
    pub fn add_task(
        &mut self,
        section_id: &str,
        subsection_title: &str,
        task: Task,
    ) -> Result<String> {
        let id = self.catalog.add_task(section_id, subsection_title, task)?;
        self.revision += 1;
        Ok(id)
    }

    pub fn add_subsection(&mut self, section_id: &str, title: &str) -> Result<()> {
        self.catalog.add_subsection(section_id, title)?;
        self.revision += 1;
        Ok(())
    }

    // =========================================================================
    // Comments and notifications
    // =========================================================================

    pub fn upsert_user(&mut self, user: User) {
        self.state.users.insert(user.id.clone(), user);
        self.revision += 1;
    }

    /// Set the identity new comments are authored as.
    pub fn set_current_user(&mut self, user_id: &str) {
        self.state.current_user = user_id.to_string();
        self.revision += 1;
    }

    /// Add a comment, generating one unread notification per mentioned
    /// user other than the author.
    pub fn add_comment(
        &mut self,
        task_id: &str,
        fabric_id: &str,
        content: &str,
        parent_comment_id: Option<String>,
    ) -> Result<String> {
        if content.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "comment content cannot be empty".to_string(),
            ));
        }
        let comment = TaskComment::new(
            task_id,
            fabric_id,
            self.state.current_user.clone(),
            content,
            parent_comment_id,
        );
        let comment_id = comment.id.clone();
        for notification in notifications_for(&comment) {
            self.dispatch(Action::AddNotification { notification });
        }
        self.dispatch(Action::AddComment { comment });
        Ok(comment_id)
    }

    pub fn update_comment(&mut self, comment: TaskComment) {
        self.dispatch(Action::UpdateComment {
            comment,
            edited_at: Utc::now(),
        });
    }

    pub fn delete_comment(&mut self, task_id: &str, comment_id: &str) {
        self.dispatch(Action::DeleteComment {
            task_id: task_id.to_string(),
            comment_id: comment_id.to_string(),
        });
    }

    pub fn mark_notification_read(&mut self, notification_id: &str) {
        self.dispatch(Action::MarkNotificationRead {
            notification_id: notification_id.to_string(),
        });
    }

    pub fn clear_notifications(&mut self) {
        self.dispatch(Action::ClearNotifications);
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.dispatch(Action::LoadData { snapshot });
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, Utc::now())
    }

    // =========================================================================
    // Read views
    // =========================================================================

    pub fn fabric_progress(&self, fabric_id: &str) -> FabricProgress {
        fabric_progress(&self.state, &self.catalog, &self.fabrics, fabric_id)
    }

    pub fn tasks_for_fabric(&self, fabric_id: &str) -> Vec<TaskView> {
        tasks_for_fabric(&self.state, &self.catalog, &self.fabrics, fabric_id)
    }

    pub fn current_fabric_tasks(&self) -> Vec<TaskView> {
        self.tasks_for_fabric(&self.state.current_fabric.clone())
    }

    pub fn completed_tasks(&self) -> Vec<CompletedTask> {
        completed_tasks(&self.state, &self.catalog, &self.fabrics)
    }

    pub fn weekly_report(&self, now: DateTime<Utc>) -> WeeklyReport {
        weekly_report(&self.state, &self.catalog, &self.fabrics, now)
    }

    pub fn can_complete(&self, fabric_id: &str, task_id: &str) -> bool {
        deps::can_complete(&self.state, &self.catalog, fabric_id, task_id)
    }

    pub fn dependency_status(&self, fabric_id: &str, task_id: &str) -> Vec<PrerequisiteStatus> {
        deps::dependency_status(&self.state, &self.catalog, fabric_id, task_id)
    }

    pub fn dependent_tasks(&self, tc_id: &str) -> Vec<&Task> {
        deps::dependent_tasks(&self.catalog, tc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;
    use crate::fabric::builtin_fabrics;
    use chrono::TimeZone;

    fn store() -> Store {
        Store::new(sample_catalog(), builtin_fabrics(), "north-it")
    }

    fn free_task_id(store: &Store) -> String {
        store.catalog().find_task_by_tc("TC-ACC-001").unwrap().id.clone()
    }

    #[test]
    fn completion_flag_and_date_move_as_one_unit() {
        let mut store = store();
        let task_id = free_task_id(&store);
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();

        store.set_task_state_at("north-it", &task_id, true, at);
        assert!(store.state().task_checked("north-it", &task_id));
        assert_eq!(store.state().completion_date("north-it", &task_id), Some(at));

        store.set_task_state("north-it", &task_id, false);
        assert!(!store.state().task_checked("north-it", &task_id));
        assert_eq!(store.state().completion_date("north-it", &task_id), None);
    }

    #[test]
    fn true_to_true_does_not_restamp_date() {
        let mut store = store();
        let task_id = free_task_id(&store);
        let first = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 6, 10, 0, 0).unwrap();

        store.set_task_state_at("north-it", &task_id, true, first);
        let revision = store.revision();
        store.set_task_state_at("north-it", &task_id, true, later);

        assert_eq!(store.revision(), revision);
        assert_eq!(
            store.state().completion_date("north-it", &task_id),
            Some(first)
        );
    }

    #[test]
    fn blocked_completion_is_a_logged_noop() {
        let mut store = store();
        let blocked = store.catalog().find_task_by_tc("TC-CON-001").unwrap().id.clone();

        let before = store.state().clone();
        store.set_task_state("north-it", &blocked, true);
        assert_eq!(store.state(), &before);

        store.set_test_case_status("north-it", "TC-ACC-001", ExecutionStatus::Pass);
        store.set_task_state("north-it", &blocked, true);
        assert!(store.state().task_checked("north-it", &blocked));
    }

    #[test]
    fn notes_stamp_modification_date_only_when_non_empty() {
        let mut store = store();
        let task_id = free_task_id(&store);
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();

        store.set_task_notes_at("north-it", &task_id, "", at);
        assert_eq!(store.state().note_modification_date("north-it", &task_id), None);

        store.set_task_notes_at("north-it", &task_id, "started", at);
        assert_eq!(
            store.state().note_modification_date("north-it", &task_id),
            Some(at)
        );
    }

    #[test]
    fn sub_checklist_validation() {
        let mut store = store();
        let task_id = free_task_id(&store);

        let err = store.save_sub_checklist("  ", &[task_id.clone()]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = store.save_sub_checklist("Phase1", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        store.save_sub_checklist("Phase1", &[task_id]).unwrap();
        assert_eq!(store.state().sub_checklists["Phase1"].fabric_id, "north-it");

        store.delete_sub_checklist("Phase1");
        assert!(store.state().sub_checklists.is_empty());
    }

    #[test]
    fn bulk_state_update_is_per_fabric_independent() {
        let mut store = store();
        let blocked = store.catalog().find_task_by_tc("TC-CON-001").unwrap().id.clone();

        // Prerequisite passes on north-it only.
        store.set_test_case_status("north-it", "TC-ACC-001", ExecutionStatus::Pass);
        store.set_task_state_across(
            &blocked,
            true,
            &["north-it".to_string(), "south-ot".to_string()],
        );

        // Best-effort: the unblocked fabric succeeds, the blocked one no-ops.
        assert!(store.state().task_checked("north-it", &blocked));
        assert!(!store.state().task_checked("south-ot", &blocked));
    }

    #[test]
    fn comment_mentions_generate_notifications() {
        let mut store = store();
        store.upsert_user(User {
            id: "user-2".into(),
            display_name: "Alice".into(),
        });

        let err = store.add_comment("task-1", "north-it", "   ", None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        store
            .add_comment("task-1", "north-it", "cc @[Alice](user-2)", None)
            .unwrap();
        let unread = store.state().unread_notifications();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].user_id, "user-2");

        let id = unread[0].id.clone();
        store.mark_notification_read(&id);
        assert!(store.state().unread_notifications().is_empty());
    }

    #[test]
    fn comments_are_authored_as_the_current_user() {
        let mut store = store();
        store.set_current_user("u-7");

        let id = store
            .add_comment("task-1", "north-it", "self note @[Me](u-7)", None)
            .unwrap();
        let stored = store.state().comments_for("task-1")[0].clone();
        assert_eq!(stored.user_id, "u-7");
        // Self-mentions never notify.
        assert!(store.state().unread_notifications().is_empty());

        let mut edited = stored;
        edited.content = "revised".into();
        store.update_comment(edited);
        assert_eq!(store.state().comments_for("task-1")[0].content, "revised");
        assert!(store.state().comments_for("task-1")[0].edited_at.is_some());

        store.delete_comment("task-1", &id);
        assert!(store.state().comments_for("task-1").is_empty());
    }

    #[test]
    fn clone_tasks_across_copies_overlay() {
        let mut store = store();
        let task_id = free_task_id(&store);
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();

        store.set_task_state_at("north-it", &task_id, true, at);
        store.set_task_notes("north-it", &task_id, "done early");
        store.set_task_category("north-it", &task_id, Category::MustHave);

        store.clone_tasks_across(
            &[task_id.clone(), "task-unknown".to_string()],
            "north-it",
            &["south-it".to_string()],
        );

        assert!(store.state().task_checked("south-it", &task_id));
        assert_eq!(store.state().completion_date("south-it", &task_id), Some(at));
        assert_eq!(store.state().task_notes("south-it", &task_id), "done early");
        assert_eq!(
            store.state().task_category("south-it", &task_id),
            Category::MustHave
        );
    }

    #[test]
    fn progress_scenario_matches_applicable_count() {
        let mut store = store();
        let task_id = free_task_id(&store);
        store.set_task_state("north-it", &task_id, true);

        let progress = store.fabric_progress("north-it");
        assert_eq!(progress.completed_tasks, 1);

        // north-it is not Tertiary, so the NDO task is excluded.
        let applicable = store
            .catalog()
            .tasks()
            .filter(|task| {
                task.applies_to(crate::fabric::find_fabric(store.fabrics(), "north-it").unwrap())
            })
            .count();
        assert_eq!(progress.total_tasks, applicable);
        assert_eq!(store.fabric_progress("unknown").total_tasks, 0);
    }
}
