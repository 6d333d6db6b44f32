//! fabtrack status command implementation

use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub fn run(dir: Option<PathBuf>, fabric: Option<String>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let fabric_id = ctx.resolve_fabric(fabric)?;
    let progress = ctx.store.fabric_progress(&fabric_id);
    let unread = ctx.store.state().unread_notifications().len();

    let mut human = HumanOutput::new(format!("fabtrack status: {fabric_id}"));
    human.push_summary(
        "tasks",
        format!("{}/{}", progress.completed_tasks, progress.total_tasks),
    );
    human.push_summary(
        "test cases passed",
        format!(
            "{}/{}",
            progress.completed_test_cases, progress.total_test_cases
        ),
    );
    if progress.high_priority_pending > 0 {
        human.push_warning(format!(
            "{} high-priority test case(s) not yet executed",
            progress.high_priority_pending
        ));
    }
    if unread > 0 {
        human.push_detail(format!("{unread} unread notification(s)"));
        human.push_next_step("fabtrack notify list");
    }

    emit_success(opts, "status", &progress, Some(&human))
}
