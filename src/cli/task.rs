//! fabtrack task commands implementation

use std::path::PathBuf;

use crate::catalog::Task;
use crate::cli::context::AppContext;
use crate::cli::{parse_category, parse_lane};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub fn run_list(dir: Option<PathBuf>, fabric: Option<String>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;
    let tasks = ctx.store.tasks_for_fabric(&fabric_id);

    let mut human = HumanOutput::new(format!("fabtrack tasks: {fabric_id}"));
    for view in &tasks {
        let mark = if view.checked { "x" } else { " " };
        let tc = view
            .task
            .test_case
            .as_ref()
            .map(|tc| format!(" [{}]", tc.tc_id))
            .unwrap_or_default();
        human.push_detail(format!("[{mark}] {} {}{tc}", view.task.id, view.task.text));
    }

    emit_success(opts, "task list", &tasks, Some(&human))
}

#[derive(serde::Serialize)]
struct StateReport {
    task_id: String,
    checked: bool,
    fabrics: Vec<String>,
    applied: Vec<String>,
}

pub fn run_set_state(
    dir: Option<PathBuf>,
    task: String,
    checked: bool,
    fabric: Option<String>,
    fabrics: Vec<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let targets = resolve_targets(&ctx, fabric, fabrics)?;

    if targets.len() == 1 {
        ctx.store.set_task_state(&targets[0], &task_id, checked);
    } else {
        ctx.store.set_task_state_across(&task_id, checked, &targets);
    }
    ctx.save_state()?;

    // A blocked completion leaves the flag unchanged; report what held.
    let applied: Vec<String> = targets
        .iter()
        .filter(|fabric_id| ctx.store.state().task_checked(fabric_id, &task_id) == checked)
        .cloned()
        .collect();

    let verb = if checked { "check" } else { "uncheck" };
    let mut human = HumanOutput::new(format!("fabtrack task {verb}: {task_id}"));
    human.push_summary("fabrics", targets.join(", "));
    for fabric_id in &targets {
        if !applied.contains(fabric_id) {
            human.push_warning(format!(
                "{fabric_id}: blocked by unmet prerequisites"
            ));
            human.push_next_step(format!("fabtrack task deps {task_id} --fabric {fabric_id}"));
        }
    }

    let report = StateReport {
        task_id,
        checked,
        fabrics: targets,
        applied,
    };
    emit_success(opts, "task", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct NoteReport {
    task_id: String,
    fabric_id: String,
    notes: String,
}

pub fn run_note(
    dir: Option<PathBuf>,
    task: String,
    text: String,
    fabric: Option<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;

    ctx.store.set_task_notes(&fabric_id, &task_id, &text);
    ctx.save_state()?;

    let report = NoteReport {
        task_id: task_id.clone(),
        fabric_id: fabric_id.clone(),
        notes: text,
    };
    let mut human = HumanOutput::new(format!("fabtrack task note: {task_id}"));
    human.push_summary("fabric", fabric_id);

    emit_success(opts, "task note", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct CategoryReport {
    task_id: String,
    category: crate::state::Category,
    fabrics: Vec<String>,
}

pub fn run_category(
    dir: Option<PathBuf>,
    task: String,
    category: String,
    fabric: Option<String>,
    fabrics: Vec<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let category = parse_category(&category)?;
    let targets = resolve_targets(&ctx, fabric, fabrics)?;

    ctx.store.set_task_category_across(&task_id, category, &targets);
    ctx.save_state()?;

    let report = CategoryReport {
        task_id: task_id.clone(),
        category,
        fabrics: targets.clone(),
    };
    let mut human = HumanOutput::new(format!("fabtrack task category: {task_id}"));
    human.push_summary("fabrics", targets.join(", "));

    emit_success(opts, "task category", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct KanbanReport {
    task_id: String,
    fabric_id: String,
    lane: crate::state::KanbanLane,
}

pub fn run_kanban(
    dir: Option<PathBuf>,
    task: String,
    lane: String,
    fabric: Option<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let lane = parse_lane(&lane)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;

    ctx.store.set_task_kanban(&fabric_id, &task_id, lane);
    ctx.save_state()?;

    let report = KanbanReport {
        task_id: task_id.clone(),
        fabric_id: fabric_id.clone(),
        lane,
    };
    let mut human = HumanOutput::new(format!("fabtrack task kanban: {task_id}"));
    human.push_summary("fabric", fabric_id);

    emit_success(opts, "task kanban", &report, Some(&human))
}

pub struct AddOptions {
    pub text: String,
    pub section: String,
    pub subsection: String,
    pub fabric_specific: bool,
    pub ndo: bool,
}

#[derive(serde::Serialize)]
struct AddReport {
    task_id: String,
    section_id: String,
    subsection: String,
}

pub fn run_add(dir: Option<PathBuf>, add: AddOptions, opts: OutputOptions) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;

    let mut task = Task::new(add.text);
    if add.fabric_specific {
        task = task.fabric_specific();
    }
    if add.ndo {
        task = task.ndo_centralized();
    }

    let task_id = ctx.store.add_task(&add.section, &add.subsection, task)?;
    ctx.save_catalog()?;

    let report = AddReport {
        task_id: task_id.clone(),
        section_id: add.section,
        subsection: add.subsection,
    };
    let mut human = HumanOutput::new(format!("fabtrack task add: {task_id}"));
    human.push_summary("section", report.section_id.clone());
    human.push_summary("subsection", report.subsection.clone());
    human.push_next_step(format!("fabtrack task check {task_id}"));

    emit_success(opts, "task add", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct SubsectionReport {
    section_id: String,
    title: String,
}

pub fn run_add_subsection(
    dir: Option<PathBuf>,
    section: String,
    title: String,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    ctx.store.add_subsection(&section, &title)?;
    ctx.save_catalog()?;

    let report = SubsectionReport {
        section_id: section,
        title: title.clone(),
    };
    let human = HumanOutput::new(format!("fabtrack subsection add: {title}"));

    emit_success(opts, "subsection add", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct DepsReport {
    task_id: String,
    fabric_id: String,
    can_complete: bool,
    prerequisites: Vec<crate::deps::PrerequisiteStatus>,
}

pub fn run_deps(
    dir: Option<PathBuf>,
    task: String,
    fabric: Option<String>,
    opts: OutputOptions,
) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let task_id = ctx.resolve_task(&task)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;

    let prerequisites = ctx.store.dependency_status(&fabric_id, &task_id);
    let can_complete = ctx.store.can_complete(&fabric_id, &task_id);

    let mut human = HumanOutput::new(format!("fabtrack task deps: {task_id}"));
    human.push_summary("fabric", fabric_id.clone());
    human.push_summary("can complete", can_complete.to_string());
    if prerequisites.is_empty() {
        human.push_detail("no prerequisites".to_string());
    }
    for prereq in &prerequisites {
        let mark = if prereq.satisfied { "ok" } else { "blocked" };
        human.push_detail(format!("{} - {:?} ({mark})", prereq.tc_id, prereq.status));
    }

    let report = DepsReport {
        task_id,
        fabric_id,
        can_complete,
        prerequisites,
    };
    emit_success(opts, "task deps", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct CloneReport {
    tasks: Vec<String>,
    source: String,
    targets: Vec<String>,
}

pub fn run_clone(
    dir: Option<PathBuf>,
    tasks: Vec<String>,
    from: Option<String>,
    to: Vec<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let source = ctx.resolve_fabric(from)?;
    let mut targets = Vec::with_capacity(to.len());
    for fabric_id in to {
        targets.push(ctx.resolve_fabric(Some(fabric_id))?);
    }
    let mut task_ids = Vec::with_capacity(tasks.len());
    for task in &tasks {
        task_ids.push(ctx.resolve_task(task)?);
    }

    ctx.store.clone_tasks_across(&task_ids, &source, &targets);
    ctx.save_state()?;

    let report = CloneReport {
        tasks: task_ids,
        source: source.clone(),
        targets: targets.clone(),
    };
    let mut human = HumanOutput::new("fabtrack task clone");
    human.push_summary("source", source);
    human.push_summary("targets", targets.join(", "));
    human.push_summary("tasks", report.tasks.len().to_string());

    emit_success(opts, "task clone", &report, Some(&human))
}

/// A bulk `--fabrics` list wins over `--fabric`; both default to the
/// current fabric.
fn resolve_targets(
    ctx: &AppContext,
    fabric: Option<String>,
    fabrics: Vec<String>,
) -> Result<Vec<String>> {
    if fabrics.is_empty() {
        return Ok(vec![ctx.resolve_fabric(fabric)?]);
    }
    let mut targets = Vec::with_capacity(fabrics.len());
    for fabric_id in fabrics {
        targets.push(ctx.resolve_fabric(Some(fabric_id))?);
    }
    Ok(targets)
}
