//! Comment threads, users, and mention notifications.
//!
//! Comments are scoped to a task, optionally reply to a parent comment
//! (one level of nesting in practice), and carry the user ids mentioned
//! in their content via `@[display](user-id)` markup. Mentioning a user
//! other than the author produces an unread notification for them.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A known user of the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
}

/// A comment on a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskComment {
    pub id: String,
    pub task_id: String,
    pub fabric_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl TaskComment {
    /// Build a comment, extracting mentions from the content markup.
    pub fn new(
        task_id: impl Into<String>,
        fabric_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
        parent_comment_id: Option<String>,
    ) -> Self {
        let content = content.into();
        let mentions = extract_mentions(&content);
        Self {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            fabric_id: fabric_id.into(),
            user_id: user_id.into(),
            content,
            mentions,
            parent_comment_id,
            created_at: Utc::now(),
            edited_at: None,
        }
    }
}

/// An unread/read mention notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// The mentioned user this notification is for.
    pub user_id: String,
    pub task_id: String,
    pub comment_id: String,
    pub message: String,
    /// Set only by explicit acknowledgment.
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

fn mention_regex() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| {
        Regex::new(r"@\[([^\]]+)\]\(([^)]+)\)").unwrap_or_else(|_| Regex::new("$^").unwrap())
    })
}

/// Extract the mentioned user ids from `@[display](id)` markup.
pub fn extract_mentions(content: &str) -> Vec<String> {
    mention_regex()
        .captures_iter(content)
        .map(|captures| captures[2].to_string())
        .collect()
}

/// Build notifications for every mentioned user other than the author.
pub fn notifications_for(comment: &TaskComment) -> Vec<Notification> {
    comment
        .mentions
        .iter()
        .filter(|mentioned| **mentioned != comment.user_id)
        .map(|mentioned| Notification {
            id: Uuid::new_v4().to_string(),
            user_id: mentioned.clone(),
            task_id: comment.task_id.clone(),
            comment_id: comment.id.clone(),
            message: format!("You were mentioned in a comment on {}", comment.task_id),
            read: false,
            created_at: comment.created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_mentioned_user_ids() {
        let mentions =
            extract_mentions("ping @[Alice](user-1) and @[Bob Smith](user-2), not @plain");
        assert_eq!(mentions, vec!["user-1", "user-2"]);
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[test]
    fn self_mention_produces_no_notification() {
        let comment = TaskComment::new(
            "task-1",
            "north-it",
            "user-1",
            "note to self @[Me](user-1), cc @[Alice](user-2)",
            None,
        );
        let notifications = notifications_for(&comment);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].user_id, "user-2");
        assert!(!notifications[0].read);
        assert_eq!(notifications[0].comment_id, comment.id);
    }

    #[test]
    fn comment_records_parent_for_replies() {
        let root = TaskComment::new("task-1", "north-it", "user-1", "root", None);
        let reply = TaskComment::new(
            "task-1",
            "north-it",
            "user-2",
            "reply",
            Some(root.id.clone()),
        );
        assert_eq!(reply.parent_comment_id.as_deref(), Some(root.id.as_str()));
        assert!(root.edited_at.is_none());
    }
}
