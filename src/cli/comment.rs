//! fabtrack comment and notify commands implementation

use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct CommentReport {
    comment_id: String,
    task_id: String,
    fabric_id: String,
    mentions: Vec<String>,
}

pub fn run_add(
    dir: Option<PathBuf>,
    task: String,
    text: String,
    parent: Option<String>,
    fabric: Option<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;

    let comment_id = ctx.store.add_comment(&task_id, &fabric_id, &text, parent)?;
    ctx.save_state()?;

    let mentions = ctx
        .store
        .state()
        .comments_for(&task_id)
        .iter()
        .find(|comment| comment.id == comment_id)
        .map(|comment| comment.mentions.clone())
        .unwrap_or_default();

    let report = CommentReport {
        comment_id: comment_id.clone(),
        task_id: task_id.clone(),
        fabric_id,
        mentions,
    };
    let mut human = HumanOutput::new(format!("fabtrack comment add: {task_id}"));
    human.push_summary("comment", comment_id);
    if !report.mentions.is_empty() {
        human.push_detail(format!("notified: {}", report.mentions.join(", ")));
    }

    emit_success(opts, "comment add", &report, Some(&human))
}

pub fn run_list(dir: Option<PathBuf>, task: String, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let comments = ctx.store.state().comments_for(&task_id).to_vec();

    let mut human = HumanOutput::new(format!("fabtrack comments: {task_id}"));
    if comments.is_empty() {
        human.push_detail("no comments".to_string());
    }
    for comment in &comments {
        let edited = if comment.edited_at.is_some() {
            " (edited)"
        } else {
            ""
        };
        human.push_detail(format!(
            "{} {} {}: {}{edited}",
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.id,
            comment.user_id,
            comment.content
        ));
    }

    emit_success(opts, "comment list", &comments, Some(&human))
}

pub fn run_notify_list(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let unread: Vec<_> = ctx
        .store
        .state()
        .unread_notifications()
        .into_iter()
        .cloned()
        .collect();

    let mut human = HumanOutput::new("fabtrack notifications");
    human.push_summary("unread", unread.len().to_string());
    for notification in &unread {
        human.push_detail(format!(
            "{} for {} on {}: {}",
            notification.id, notification.user_id, notification.task_id, notification.message
        ));
    }

    emit_success(opts, "notify list", &unread, Some(&human))
}

#[derive(serde::Serialize)]
struct ReadReport {
    id: String,
}

pub fn run_notify_read(dir: Option<PathBuf>, id: String, opts: OutputOptions) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    ctx.store.mark_notification_read(&id);
    ctx.save_state()?;

    let report = ReadReport { id: id.clone() };
    let human = HumanOutput::new(format!("fabtrack notify read: {id}"));
    emit_success(opts, "notify read", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct ClearReport {
    cleared: usize,
}

pub fn run_notify_clear(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let cleared = ctx.store.state().notifications.len();

    ctx.store.clear_notifications();
    ctx.save_state()?;

    let report = ClearReport { cleared };
    let human = HumanOutput::new(format!("fabtrack notify clear: {cleared} removed"));
    emit_success(opts, "notify clear", &report, Some(&human))
}
