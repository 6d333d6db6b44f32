//! Application state and the reducer over its closed action set.
//!
//! `AppState` is the canonical per-fabric overlay: completion flags, notes,
//! categories, kanban lanes, timestamps, test-case status overrides,
//! sub-checklists, comments, and notifications. All mutation goes through
//! [`reduce`], a pure function from state + action to new state.
//!
//! `reduce` is total: it never panics and never returns an error. A payload
//! that cannot be applied (unknown comment id, missing checklist) is logged
//! and the state is returned unchanged. Timestamps travel inside action
//! payloads so the reducer never reads the clock.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{ExecutionStatus, TestCase};
use crate::comment::{Notification, TaskComment, User};
use crate::snapshot::Snapshot;

/// Priority category assigned to a task per fabric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    MustHave,
    ShouldHave,
    #[default]
    None,
}

/// Kanban lane a task sits in per fabric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KanbanLane {
    #[default]
    Todo,
    InProgress,
    Testing,
    Complete,
}

/// Snapshot of one task inside a sub-checklist, denormalized at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubChecklistItem {
    pub id: String,
    pub text: String,
    pub checked: bool,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case: Option<TestCase>,
}

/// User-curated named subset of tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubChecklist {
    pub name: String,
    pub items: Vec<SubChecklistItem>,
    pub fabric_id: String,
    pub created_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Per-fabric, per-key overlay map.
pub type FabricMap<T> = BTreeMap<String, BTreeMap<String, T>>;

/// Canonical application state.
///
/// The static catalog and fabric list live outside this struct; everything
/// here is the mutable working overlay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub current_fabric: String,
    pub current_user: String,
    pub fabric_states: FabricMap<bool>,
    pub fabric_notes: FabricMap<String>,
    pub fabric_completion_dates: FabricMap<DateTime<Utc>>,
    pub fabric_note_modification_dates: FabricMap<DateTime<Utc>>,
    pub test_case_states: FabricMap<ExecutionStatus>,
    pub task_categories: FabricMap<Category>,
    pub task_kanban_status: FabricMap<KanbanLane>,
    pub sub_checklists: BTreeMap<String, SubChecklist>,
    pub users: BTreeMap<String, User>,
    pub task_comments: BTreeMap<String, Vec<TaskComment>>,
    pub notifications: Vec<Notification>,
}

impl AppState {
    pub fn new(current_fabric: impl Into<String>) -> Self {
        Self {
            current_fabric: current_fabric.into(),
            current_user: "default-user".to_string(),
            ..Self::default()
        }
    }

    /// Completion flag for a task on a fabric (false when unset).
    pub fn task_checked(&self, fabric_id: &str, task_id: &str) -> bool {
        self.fabric_states
            .get(fabric_id)
            .and_then(|tasks| tasks.get(task_id))
            .copied()
            .unwrap_or(false)
    }

    /// Notes for a task on a fabric (empty when unset).
    pub fn task_notes(&self, fabric_id: &str, task_id: &str) -> &str {
        self.fabric_notes
            .get(fabric_id)
            .and_then(|tasks| tasks.get(task_id))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn completion_date(&self, fabric_id: &str, task_id: &str) -> Option<DateTime<Utc>> {
        self.fabric_completion_dates
            .get(fabric_id)
            .and_then(|tasks| tasks.get(task_id))
            .copied()
    }

    pub fn note_modification_date(&self, fabric_id: &str, task_id: &str) -> Option<DateTime<Utc>> {
        self.fabric_note_modification_dates
            .get(fabric_id)
            .and_then(|tasks| tasks.get(task_id))
            .copied()
    }

    pub fn task_category(&self, fabric_id: &str, task_id: &str) -> Category {
        self.task_categories
            .get(fabric_id)
            .and_then(|tasks| tasks.get(task_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn task_kanban(&self, fabric_id: &str, task_id: &str) -> KanbanLane {
        self.task_kanban_status
            .get(fabric_id)
            .and_then(|tasks| tasks.get(task_id))
            .copied()
            .unwrap_or_default()
    }

    /// Effective execution status overlay for a test case on a fabric.
    pub fn test_case_status(&self, fabric_id: &str, tc_id: &str) -> Option<ExecutionStatus> {
        self.test_case_states
            .get(fabric_id)
            .and_then(|cases| cases.get(tc_id))
            .copied()
    }

    pub fn comments_for(&self, task_id: &str) -> &[TaskComment] {
        self.task_comments
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn unread_notifications(&self) -> Vec<&Notification> {
        self.notifications.iter().filter(|n| !n.read).collect()
    }
}

/// The closed set of state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetCurrentFabric {
        fabric_id: String,
    },
    SetTaskState {
        fabric_id: String,
        task_id: String,
        checked: bool,
    },
    /// Companion to `SetTaskState`: stamps the date on completion, clears
    /// it on un-completion. Always dispatched in lockstep with it.
    SetTaskCompletionDate {
        fabric_id: String,
        task_id: String,
        checked: bool,
        at: DateTime<Utc>,
    },
    SetTaskNotes {
        fabric_id: String,
        task_id: String,
        notes: String,
    },
    SetNoteModificationDate {
        fabric_id: String,
        task_id: String,
        at: DateTime<Utc>,
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
    /// Name collisions silently overwrite; name is the map key.
    SaveSubChecklist {
        checklist: SubChecklist,
    },
    DeleteSubChecklist {
        name: String,
    },
    AddComment {
        comment: TaskComment,
    },
    UpdateComment {
        comment: TaskComment,
        edited_at: DateTime<Utc>,
    },
    DeleteComment {
        task_id: String,
        comment_id: String,
    },
    AddNotification {
        notification: Notification,
    },
    MarkNotificationRead {
        notification_id: String,
    },
    ClearNotifications,
    /// Replace overlay state from a persisted snapshot.
    LoadData {
        snapshot: Snapshot,
    },
}

/// Apply an action to the state, returning the new state.
pub fn reduce(state: &AppState, action: &Action) -> AppState {
    let mut next = state.clone();
    match action {
        Action::SetCurrentFabric { fabric_id } => {
            // No validation that the id is known; the UI only offers real ones.
            next.current_fabric = fabric_id.clone();
        }

        Action::SetTaskState {
            fabric_id,
            task_id,
            checked,
        } => {
            next.fabric_states
                .entry(fabric_id.clone())
                .or_default()
                .insert(task_id.clone(), *checked);
        }

        Action::SetTaskCompletionDate {
            fabric_id,
            task_id,
            checked,
            at,
        } => {
            let dates = next.fabric_completion_dates.entry(fabric_id.clone()).or_default();
            if *checked {
                dates.insert(task_id.clone(), *at);
            } else {
                dates.remove(task_id);
            }
        }

        Action::SetTaskNotes {
            fabric_id,
            task_id,
            notes,
        } => {
            next.fabric_notes
                .entry(fabric_id.clone())
                .or_default()
                .insert(task_id.clone(), notes.clone());
        }

        Action::SetNoteModificationDate {
            fabric_id,
            task_id,
            at,
        } => {
            next.fabric_note_modification_dates
                .entry(fabric_id.clone())
                .or_default()
                .insert(task_id.clone(), *at);
        }

        Action::SetTaskCategory {
            fabric_id,
            task_id,
            category,
        } => {
            next.task_categories
                .entry(fabric_id.clone())
                .or_default()
                .insert(task_id.clone(), *category);
        }

        Action::SetTaskKanban {
            fabric_id,
            task_id,
            lane,
        } => {
            next.task_kanban_status
                .entry(fabric_id.clone())
                .or_default()
                .insert(task_id.clone(), *lane);
        }

        Action::SetTestCaseStatus {
            fabric_id,
            tc_id,
            status,
        } => {
            next.test_case_states
                .entry(fabric_id.clone())
                .or_default()
                .insert(tc_id.clone(), *status);
        }

        Action::SaveSubChecklist { checklist } => {
            next.sub_checklists
                .insert(checklist.name.clone(), checklist.clone());
        }

        Action::DeleteSubChecklist { name } => {
            if next.sub_checklists.remove(name).is_none() {
                warn!(name, "delete_sub_checklist: no such checklist");
            }
        }

        Action::AddComment { comment } => {
            next.task_comments
                .entry(comment.task_id.clone())
                .or_default()
                .push(comment.clone());
        }

        Action::UpdateComment { comment, edited_at } => {
            let found = next
                .task_comments
                .get_mut(&comment.task_id)
                .and_then(|comments| comments.iter_mut().find(|c| c.id == comment.id));
            match found {
                Some(existing) => {
                    *existing = comment.clone();
                    existing.edited_at = Some(*edited_at);
                }
                None => warn!(comment_id = %comment.id, "update_comment: no such comment"),
            }
        }

        Action::DeleteComment {
            task_id,
            comment_id,
        } => match next.task_comments.get_mut(task_id) {
            Some(comments) => comments.retain(|c| c.id != *comment_id),
            None => warn!(%task_id, "delete_comment: task has no comments"),
        },

        Action::AddNotification { notification } => {
            next.notifications.push(notification.clone());
        }

        Action::MarkNotificationRead { notification_id } => {
            match next
                .notifications
                .iter_mut()
                .find(|n| n.id == *notification_id)
            {
                Some(notification) => notification.read = true,
                None => warn!(%notification_id, "mark_notification_read: no such notification"),
            }
        }

        Action::ClearNotifications => {
            next.notifications.clear();
        }

        Action::LoadData { snapshot } => {
            snapshot.apply_to(&mut next);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn set_task_state_is_keyed_by_fabric_then_task() {
        let state = AppState::new("north-it");
        let next = reduce(
            &state,
            &Action::SetTaskState {
                fabric_id: "north-it".into(),
                task_id: "task-1".into(),
                checked: true,
            },
        );
        assert!(next.task_checked("north-it", "task-1"));
        assert!(!next.task_checked("south-ot", "task-1"));
        // Original state untouched.
        assert!(!state.task_checked("north-it", "task-1"));
    }

    #[test]
    fn completion_date_set_and_cleared() {
        let state = AppState::new("north-it");
        let checked = reduce(
            &state,
            &Action::SetTaskCompletionDate {
                fabric_id: "north-it".into(),
                task_id: "task-1".into(),
                checked: true,
                at: ts(5),
            },
        );
        assert_eq!(checked.completion_date("north-it", "task-1"), Some(ts(5)));

        let cleared = reduce(
            &checked,
            &Action::SetTaskCompletionDate {
                fabric_id: "north-it".into(),
                task_id: "task-1".into(),
                checked: false,
                at: ts(6),
            },
        );
        assert_eq!(cleared.completion_date("north-it", "task-1"), None);
    }

    #[test]
    fn unapplicable_payload_returns_state_unchanged() {
        let state = AppState::new("north-it");
        let next = reduce(
            &state,
            &Action::DeleteSubChecklist {
                name: "missing".into(),
            },
        );
        assert_eq!(state, next);

        let next = reduce(
            &state,
            &Action::MarkNotificationRead {
                notification_id: "missing".into(),
            },
        );
        assert_eq!(state, next);
    }

    #[test]
    fn checklist_name_collision_overwrites() {
        let state = AppState::new("north-it");
        let checklist = |items: usize| SubChecklist {
            name: "Phase1".into(),
            items: (0..items)
                .map(|i| SubChecklistItem {
                    id: format!("task-{i}"),
                    text: format!("item {i}"),
                    checked: false,
                    notes: String::new(),
                    test_case: None,
                })
                .collect(),
            fabric_id: "north-it".into(),
            created_date: ts(1),
            last_modified: ts(1),
        };

        let one = reduce(
            &state,
            &Action::SaveSubChecklist {
                checklist: checklist(1),
            },
        );
        let two = reduce(
            &one,
            &Action::SaveSubChecklist {
                checklist: checklist(2),
            },
        );
        assert_eq!(two.sub_checklists.len(), 1);
        assert_eq!(two.sub_checklists["Phase1"].items.len(), 2);
    }

    #[test]
    fn update_comment_stamps_edited_at() {
        let state = AppState::new("north-it");
        let comment = crate::comment::TaskComment::new("task-1", "north-it", "user-1", "v1", None);
        let added = reduce(
            &state,
            &Action::AddComment {
                comment: comment.clone(),
            },
        );

        let mut edited = comment.clone();
        edited.content = "v2".into();
        let updated = reduce(
            &added,
            &Action::UpdateComment {
                comment: edited,
                edited_at: ts(9),
            },
        );
        let stored = &updated.comments_for("task-1")[0];
        assert_eq!(stored.content, "v2");
        assert_eq!(stored.edited_at, Some(ts(9)));
    }
}
