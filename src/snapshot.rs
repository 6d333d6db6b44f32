//! Persisted full-state snapshot.
//!
//! This is the JSON shape written to the local cache and exchanged with
//! the remote store. Field names are camelCase on the wire. Maps are
//! ordered so serialization is deterministic: the synchronizer compares
//! serialized snapshots to decide whether a remote push is needed, and
//! round-trip fidelity (`load(save(s)) == s`) is a required property.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ExecutionStatus;
use crate::comment::{Notification, TaskComment};
use crate::error::Result;
use crate::state::{AppState, Category, FabricMap, KanbanLane, SubChecklist};

/// Serialized full-state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub fabric_states: FabricMap<bool>,
    pub fabric_notes: FabricMap<String>,
    pub fabric_completion_dates: FabricMap<DateTime<Utc>>,
    pub fabric_note_modification_dates: FabricMap<DateTime<Utc>>,
    pub test_case_states: FabricMap<ExecutionStatus>,
    pub task_categories: FabricMap<Category>,
    pub task_kanban_status: FabricMap<KanbanLane>,
    pub sub_checklists: BTreeMap<String, SubChecklist>,
    pub task_comments: BTreeMap<String, Vec<TaskComment>>,
    pub notifications: Vec<Notification>,
    pub current_fabric: Option<String>,
    pub last_saved: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Capture the persistable portion of the application state.
    pub fn capture(state: &AppState, last_saved: DateTime<Utc>) -> Self {
        Self {
            fabric_states: state.fabric_states.clone(),
            fabric_notes: state.fabric_notes.clone(),
            fabric_completion_dates: state.fabric_completion_dates.clone(),
            fabric_note_modification_dates: state.fabric_note_modification_dates.clone(),
            test_case_states: state.test_case_states.clone(),
            task_categories: state.task_categories.clone(),
            task_kanban_status: state.task_kanban_status.clone(),
            sub_checklists: state.sub_checklists.clone(),
            task_comments: state.task_comments.clone(),
            notifications: state.notifications.clone(),
            current_fabric: Some(state.current_fabric.clone()),
            last_saved: Some(last_saved),
        }
    }

    /// Replace the overlay portion of `state` with this snapshot's data.
    ///
    /// The current fabric is only replaced when the snapshot carries one,
    /// mirroring the original load semantics.
    pub fn apply_to(&self, state: &mut AppState) {
        state.fabric_states = self.fabric_states.clone();
        state.fabric_notes = self.fabric_notes.clone();
        state.fabric_completion_dates = self.fabric_completion_dates.clone();
        state.fabric_note_modification_dates = self.fabric_note_modification_dates.clone();
        state.test_case_states = self.test_case_states.clone();
        state.task_categories = self.task_categories.clone();
        state.task_kanban_status = self.task_kanban_status.clone();
        state.sub_checklists = self.sub_checklists.clone();
        state.task_comments = self.task_comments.clone();
        state.notifications = self.notifications.clone();
        if let Some(current) = &self.current_fabric {
            state.current_fabric = current.clone();
        }
    }

    /// Serialize to the canonical JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from the JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
