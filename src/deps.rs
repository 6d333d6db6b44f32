//! Dependency gating for task completion.
//!
//! A task whose test case declares prerequisite test-case ids may only be
//! completed once every prerequisite has Pass status on the same fabric.
//! Only directly declared prerequisites are checked; there is no transitive
//! traversal, so a cycle in the catalog would leave its tasks permanently
//! blocked rather than being detected here.

use serde::Serialize;

use crate::catalog::{Catalog, ExecutionStatus, Task};
use crate::state::AppState;

/// Effective execution status of a test case on a fabric: the per-fabric
/// overlay when present, otherwise the catalog's static status, otherwise
/// T.B.E. for ids the catalog does not know.
pub fn effective_status(
    state: &AppState,
    catalog: &Catalog,
    fabric_id: &str,
    tc_id: &str,
) -> ExecutionStatus {
    if let Some(status) = state.test_case_status(fabric_id, tc_id) {
        return status;
    }
    catalog
        .find_task_by_tc(tc_id)
        .and_then(|task| task.test_case.as_ref())
        .map(|tc| tc.status)
        .unwrap_or_default()
}

/// Whether the task may be marked complete on the given fabric.
///
/// False iff the task's test case lists at least one prerequisite whose
/// effective status is not Pass. Tasks without a test case or without
/// prerequisites are always completable.
pub fn can_complete(state: &AppState, catalog: &Catalog, fabric_id: &str, task_id: &str) -> bool {
    let Some(test_case) = catalog
        .find_task(task_id)
        .and_then(|task| task.test_case.as_ref())
    else {
        return true;
    };

    test_case.dependencies.iter().all(|tc_id| {
        effective_status(state, catalog, fabric_id, tc_id) == ExecutionStatus::Pass
    })
}

/// Per-prerequisite gating detail for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrerequisiteStatus {
    pub tc_id: String,
    pub status: ExecutionStatus,
    pub satisfied: bool,
}

/// The gating detail for every prerequisite the task declares.
pub fn dependency_status(
    state: &AppState,
    catalog: &Catalog,
    fabric_id: &str,
    task_id: &str,
) -> Vec<PrerequisiteStatus> {
    let Some(test_case) = catalog
        .find_task(task_id)
        .and_then(|task| task.test_case.as_ref())
    else {
        return Vec::new();
    };

    test_case
        .dependencies
        .iter()
        .map(|tc_id| {
            let status = effective_status(state, catalog, fabric_id, tc_id);
            PrerequisiteStatus {
                tc_id: tc_id.clone(),
                status,
                satisfied: status == ExecutionStatus::Pass,
            }
        })
        .collect()
}

/// Reverse lookup: every catalog task whose test case lists `tc_id` as a
/// prerequisite. A full linear scan; the catalog is small and fixed.
pub fn dependent_tasks<'a>(catalog: &'a Catalog, tc_id: &str) -> Vec<&'a Task> {
    catalog
        .tasks()
        .filter(|task| {
            task.test_case
                .as_ref()
                .is_some_and(|tc| tc.dependencies.iter().any(|dep| dep == tc_id))
        })
        .collect()
}
