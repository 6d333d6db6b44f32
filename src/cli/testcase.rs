//! fabtrack test commands implementation

use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::cli::parse_status;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct TestReport {
    tc_id: String,
    fabric_id: String,
    status: crate::catalog::ExecutionStatus,
    unblocked_tasks: Vec<String>,
}

pub fn run_set(
    dir: Option<PathBuf>,
    tc_id: String,
    status: String,
    fabric: Option<String>,
    opts: OutputOptions,
) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let status = parse_status(&status)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;

    if ctx.store.catalog().find_task_by_tc(&tc_id).is_none() {
        return Err(Error::UnknownTask(tc_id));
    }

    ctx.store.set_test_case_status(&fabric_id, &tc_id, status);
    ctx.save_state()?;

    // Tasks that were waiting on this test case and can now proceed.
    let unblocked_tasks: Vec<String> = ctx
        .store
        .dependent_tasks(&tc_id)
        .iter()
        .filter(|task| ctx.store.can_complete(&fabric_id, &task.id))
        .map(|task| task.id.clone())
        .collect();

    let mut human = HumanOutput::new(format!("fabtrack test set: {tc_id}"));
    human.push_summary("fabric", fabric_id.clone());
    human.push_summary("status", format!("{status:?}"));
    for task_id in &unblocked_tasks {
        human.push_detail(format!("{task_id} is no longer blocked"));
    }

    let report = TestReport {
        tc_id,
        fabric_id,
        status,
        unblocked_tasks,
    };
    emit_success(opts, "test set", &report, Some(&human))
}
