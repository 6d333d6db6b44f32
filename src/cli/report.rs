//! fabtrack completed and week commands implementation

use std::path::PathBuf;

use chrono::Utc;

use crate::cli::context::AppContext;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub fn run_completed(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let completed = ctx.store.completed_tasks();

    let mut human = HumanOutput::new("fabtrack completed");
    human.push_summary("total", completed.len().to_string());
    for task in &completed {
        let when = task
            .completed_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        human.push_detail(format!("{} {} ({}) {}", when, task.task_id, task.fabric_id, task.text));
    }

    emit_success(opts, "completed", &completed, Some(&human))
}

pub fn run_week(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let report = ctx.store.weekly_report(Utc::now());

    let mut human = HumanOutput::new(format!(
        "fabtrack week: {} to {}",
        report.week_start.format("%Y-%m-%d"),
        report.week_end.format("%Y-%m-%d")
    ));
    human.push_summary("completed", report.completed.len().to_string());
    human.push_summary("in progress", report.in_progress.len().to_string());
    for item in &report.completed {
        human.push_detail(format!(
            "done {} {} ({})",
            item.at.format("%a"),
            item.task_id,
            item.fabric_id
        ));
    }
    for item in &report.in_progress {
        human.push_detail(format!(
            "open {} {} ({})",
            item.at.format("%a"),
            item.task_id,
            item.fabric_id
        ));
    }

    emit_success(opts, "week", &report, Some(&human))
}
