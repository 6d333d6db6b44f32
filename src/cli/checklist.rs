//! fabtrack checklist commands implementation

use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct SaveReport {
    name: String,
    fabric_id: String,
    items: usize,
}

pub fn run_save(
    dir: Option<PathBuf>,
    name: String,
    tasks: Vec<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let mut task_ids = Vec::with_capacity(tasks.len());
    for task in &tasks {
        task_ids.push(ctx.resolve_task(task)?);
    }

    ctx.store.save_sub_checklist(&name, &task_ids)?;
    ctx.save_state()?;

    let checklist = &ctx.store.state().sub_checklists[&name];
    let report = SaveReport {
        name: name.clone(),
        fabric_id: checklist.fabric_id.clone(),
        items: checklist.items.len(),
    };
    let mut human = HumanOutput::new(format!("fabtrack checklist save: {name}"));
    human.push_summary("fabric", report.fabric_id.clone());
    human.push_summary("items", report.items.to_string());

    emit_success(opts, "checklist save", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct DeleteReport {
    name: String,
    existed: bool,
}

pub fn run_delete(dir: Option<PathBuf>, name: String, opts: OutputOptions) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let existed = ctx.store.state().sub_checklists.contains_key(&name);

    ctx.store.delete_sub_checklist(&name);
    ctx.save_state()?;

    let report = DeleteReport {
        name: name.clone(),
        existed,
    };
    let mut human = HumanOutput::new(format!("fabtrack checklist delete: {name}"));
    if !existed {
        human.push_warning("no such checklist".to_string());
    }

    emit_success(opts, "checklist delete", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct ChecklistSummary {
    name: String,
    fabric_id: String,
    items: usize,
    checked: usize,
}

pub fn run_list(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;

    let summaries: Vec<ChecklistSummary> = ctx
        .store
        .state()
        .sub_checklists
        .values()
        .map(|checklist| ChecklistSummary {
            name: checklist.name.clone(),
            fabric_id: checklist.fabric_id.clone(),
            items: checklist.items.len(),
            checked: checklist.items.iter().filter(|item| item.checked).count(),
        })
        .collect();

    let mut human = HumanOutput::new("fabtrack checklists");
    if summaries.is_empty() {
        human.push_detail("none saved".to_string());
    }
    for summary in &summaries {
        human.push_detail(format!(
            "{} ({}) - {}/{} checked",
            summary.name, summary.fabric_id, summary.checked, summary.items
        ));
    }

    emit_success(opts, "checklist list", &summaries, Some(&human))
}
