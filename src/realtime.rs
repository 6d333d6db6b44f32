//! Realtime update channel.
//!
//! Other clients' edits arrive as broadcast messages while a sync session
//! runs. Updates are dispatched through the same store operations as local
//! edits, so dependency gating and timestamp coupling apply identically
//! regardless of origin. Malformed payloads are logged and dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{Error, Result};
use crate::state::{Category, KanbanLane};
use crate::store::Store;

/// Broadcast message kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    TaskStateUpdated,
    TaskNotesUpdated,
    TaskCategoryUpdated,
    TaskKanbanUpdated,
}

/// One broadcast update. `data` carries the kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    pub fabric_id: String,
    pub task_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// A connection to the broadcast feed.
#[async_trait]
pub trait RealtimeChannel: Send {
    /// Establish (or re-establish) the connection.
    async fn connect(&mut self) -> Result<()>;

    /// Wait for the next update. `Ok(None)` means the connection dropped
    /// and the caller should reconnect.
    async fn next_update(&mut self) -> Result<Option<RemoteUpdate>>;
}

/// Apply a broadcast update through the store's public operations.
pub fn apply_update(store: &mut Store, update: &RemoteUpdate) {
    match update.kind {
        UpdateKind::TaskStateUpdated => {
            let Some(checked) = update.data.get("checked").and_then(Value::as_bool) else {
                warn!(?update, "task_state_updated without boolean 'checked', dropping");
                return;
            };
            store.set_task_state_at(&update.fabric_id, &update.task_id, checked, update.timestamp);
        }
        UpdateKind::TaskNotesUpdated => {
            let Some(notes) = update.data.get("notes").and_then(Value::as_str) else {
                warn!(?update, "task_notes_updated without string 'notes', dropping");
                return;
            };
            store.set_task_notes_at(&update.fabric_id, &update.task_id, notes, update.timestamp);
        }
        UpdateKind::TaskCategoryUpdated => {
            let category: Category = match update
                .data
                .get("category")
                .cloned()
                .map(serde_json::from_value)
            {
                Some(Ok(category)) => category,
                _ => {
                    warn!(?update, "task_category_updated with bad 'category', dropping");
                    return;
                }
            };
            store.set_task_category(&update.fabric_id, &update.task_id, category);
        }
        UpdateKind::TaskKanbanUpdated => {
            let lane: KanbanLane = match update
                .data
                .get("status")
                .cloned()
                .map(serde_json::from_value)
            {
                Some(Ok(lane)) => lane,
                _ => {
                    warn!(?update, "task_kanban_updated with bad 'status', dropping");
                    return;
                }
            };
            store.set_task_kanban(&update.fabric_id, &update.task_id, lane);
        }
    }
}

/// Sender side of the in-memory channel, handed to tests.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    sender: mpsc::UnboundedSender<RemoteUpdate>,
}

impl MemoryFeed {
    pub fn publish(&self, update: RemoteUpdate) {
        let _ = self.sender.send(update);
    }
}

/// In-memory channel. `failing_connects` makes the first N connect
/// attempts fail so tests can exercise the reconnect loop.
pub struct MemoryChannel {
    receiver: mpsc::UnboundedReceiver<RemoteUpdate>,
    failing_connects: u32,
}

impl MemoryChannel {
    pub fn pair() -> (MemoryFeed, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            MemoryFeed { sender },
            Self {
                receiver,
                failing_connects: 0,
            },
        )
    }

    pub fn failing_first(mut self, attempts: u32) -> Self {
        self.failing_connects = attempts;
        self
    }
}

#[async_trait]
impl RealtimeChannel for MemoryChannel {
    async fn connect(&mut self) -> Result<()> {
        if self.failing_connects > 0 {
            self.failing_connects -= 1;
            return Err(Error::Remote("connection refused".to_string()));
        }
        Ok(())
    }

    async fn next_update(&mut self) -> Result<Option<RemoteUpdate>> {
        Ok(self.receiver.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{sample_catalog, ExecutionStatus};
    use crate::fabric::builtin_fabrics;
    use chrono::TimeZone;
    use serde_json::json;

    fn store() -> Store {
        Store::new(sample_catalog(), builtin_fabrics(), "north-it")
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn wire_shape_uses_type_and_camel_case() {
        let update = RemoteUpdate {
            kind: UpdateKind::TaskStateUpdated,
            fabric_id: "north-it".into(),
            task_id: "task-1".into(),
            data: json!({"checked": true}),
            timestamp: at(),
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], "task_state_updated");
        assert!(value.get("fabricId").is_some());
        assert!(value.get("taskId").is_some());

        let parsed: RemoteUpdate = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn state_update_applies_with_broadcast_timestamp() {
        let mut store = store();
        let task_id = store.catalog().find_task_by_tc("TC-ACC-001").unwrap().id.clone();

        apply_update(
            &mut store,
            &RemoteUpdate {
                kind: UpdateKind::TaskStateUpdated,
                fabric_id: "north-it".into(),
                task_id: task_id.clone(),
                data: json!({"checked": true}),
                timestamp: at(),
            },
        );

        assert!(store.state().task_checked("north-it", &task_id));
        assert_eq!(store.state().completion_date("north-it", &task_id), Some(at()));
    }

    #[test]
    fn remote_updates_respect_dependency_gating() {
        let mut store = store();
        let blocked = store.catalog().find_task_by_tc("TC-CON-001").unwrap().id.clone();

        // Prerequisite has not passed, so the broadcast must not complete
        // the task.
        apply_update(
            &mut store,
            &RemoteUpdate {
                kind: UpdateKind::TaskStateUpdated,
                fabric_id: "north-it".into(),
                task_id: blocked.clone(),
                data: json!({"checked": true}),
                timestamp: at(),
            },
        );
        assert!(!store.state().task_checked("north-it", &blocked));

        store.set_test_case_status("north-it", "TC-ACC-001", ExecutionStatus::Pass);
        apply_update(
            &mut store,
            &RemoteUpdate {
                kind: UpdateKind::TaskStateUpdated,
                fabric_id: "north-it".into(),
                task_id: blocked.clone(),
                data: json!({"checked": true}),
                timestamp: at(),
            },
        );
        assert!(store.state().task_checked("north-it", &blocked));
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let mut store = store();
        let before = store.revision();

        apply_update(
            &mut store,
            &RemoteUpdate {
                kind: UpdateKind::TaskNotesUpdated,
                fabric_id: "north-it".into(),
                task_id: "task-1".into(),
                data: json!({"wrong": 1}),
                timestamp: at(),
            },
        );
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn category_and_kanban_updates_apply() {
        let mut store = store();

        apply_update(
            &mut store,
            &RemoteUpdate {
                kind: UpdateKind::TaskCategoryUpdated,
                fabric_id: "north-it".into(),
                task_id: "task-1".into(),
                data: json!({"category": "must-have"}),
                timestamp: at(),
            },
        );
        apply_update(
            &mut store,
            &RemoteUpdate {
                kind: UpdateKind::TaskKanbanUpdated,
                fabric_id: "north-it".into(),
                task_id: "task-1".into(),
                data: json!({"status": "in-progress"}),
                timestamp: at(),
            },
        );

        assert_eq!(store.state().task_category("north-it", "task-1"), Category::MustHave);
        assert_eq!(
            store.state().task_kanban("north-it", "task-1"),
            KanbanLane::InProgress
        );
    }

    #[tokio::test]
    async fn memory_channel_delivers_and_fails_connects() {
        let (feed, channel) = MemoryChannel::pair();
        let mut channel = channel.failing_first(2);

        assert!(channel.connect().await.is_err());
        assert!(channel.connect().await.is_err());
        assert!(channel.connect().await.is_ok());

        feed.publish(RemoteUpdate {
            kind: UpdateKind::TaskNotesUpdated,
            fabric_id: "north-it".into(),
            task_id: "task-1".into(),
            data: json!({"notes": "hi"}),
            timestamp: at(),
        });
        let update = channel.next_update().await.unwrap().unwrap();
        assert_eq!(update.kind, UpdateKind::TaskNotesUpdated);
    }
}
