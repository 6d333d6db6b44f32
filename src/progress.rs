//! Aggregate read views over the application state.
//!
//! Everything here is a pure function of state + catalog, recomputed on
//! demand. No caching; a full scan of ~850 tasks across 6 fabrics is
//! cheap enough for synchronous rendering.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;

use crate::catalog::{Catalog, ExecutionStatus, Task, TestPriority};
use crate::deps::effective_status;
use crate::fabric::{find_fabric, Fabric};
use crate::state::{AppState, Category, KanbanLane};

/// Progress aggregates for one fabric.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FabricProgress {
    pub fabric_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_test_cases: usize,
    pub completed_test_cases: usize,
    pub high_priority_pending: usize,
}

/// A catalog task with the per-fabric overlay merged in.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub checked: bool,
    pub notes: String,
    pub category: Category,
    pub kanban: KanbanLane,
}

/// A completed task across any fabric.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    pub task_id: String,
    pub text: String,
    pub fabric_id: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: String,
}

/// Progress aggregates for a fabric; zeroed for unknown fabric ids.
pub fn fabric_progress(
    state: &AppState,
    catalog: &Catalog,
    fabrics: &[Fabric],
    fabric_id: &str,
) -> FabricProgress {
    let mut progress = FabricProgress {
        fabric_id: fabric_id.to_string(),
        ..FabricProgress::default()
    };
    let Some(fabric) = find_fabric(fabrics, fabric_id) else {
        return progress;
    };

    for task in catalog.tasks() {
        if !task.applies_to(fabric) {
            continue;
        }
        progress.total_tasks += 1;
        if state.task_checked(fabric_id, &task.id) {
            progress.completed_tasks += 1;
        }
        if let Some(test_case) = &task.test_case {
            progress.total_test_cases += 1;
            let status = effective_status(state, catalog, fabric_id, &test_case.tc_id);
            if status == ExecutionStatus::Pass {
                progress.completed_test_cases += 1;
            }
            if test_case.priority == TestPriority::High && status == ExecutionStatus::Tbe {
                progress.high_priority_pending += 1;
            }
        }
    }
    progress
}

/// Applicable tasks for a fabric with overlay state merged in.
pub fn tasks_for_fabric(
    state: &AppState,
    catalog: &Catalog,
    fabrics: &[Fabric],
    fabric_id: &str,
) -> Vec<TaskView> {
    let Some(fabric) = find_fabric(fabrics, fabric_id) else {
        return Vec::new();
    };

    catalog
        .tasks()
        .filter(|task| task.applies_to(fabric))
        .map(|task| TaskView {
            task: task.clone(),
            checked: state.task_checked(fabric_id, &task.id),
            notes: state.task_notes(fabric_id, &task.id).to_string(),
            category: state.task_category(fabric_id, &task.id),
            kanban: state.task_kanban(fabric_id, &task.id),
        })
        .collect()
}

/// Completed tasks across all fabrics, newest completion first.
/// Tasks lacking a completion date sort as oldest.
pub fn completed_tasks(state: &AppState, catalog: &Catalog, fabrics: &[Fabric]) -> Vec<CompletedTask> {
    let mut completed = Vec::new();
    for fabric in fabrics {
        for task in catalog.tasks() {
            if state.task_checked(&fabric.id, &task.id) {
                completed.push(CompletedTask {
                    task_id: task.id.clone(),
                    text: task.text.clone(),
                    fabric_id: fabric.id.clone(),
                    completed_at: state.completion_date(&fabric.id, &task.id),
                    notes: state.task_notes(&fabric.id, &task.id).to_string(),
                });
            }
        }
    }
    completed.sort_by(|left, right| match (&right.completed_at, &left.completed_at) {
        (Some(r), Some(l)) => r.cmp(l),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    });
    completed
}

/// Inclusive week window containing `now`.
///
/// A week runs Wednesday 00:00:00 through the following Tuesday
/// 23:59:59.999. This boundary matches the deployment review cadence and
/// is deliberate, not an off-by-one.
pub fn week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    // Weekday::Wed is 2 days from Monday.
    let days_back = (now.weekday().num_days_from_monday() + 7 - 2) % 7;
    let start = (now - Duration::days(i64::from(days_back)))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    let end = start + Duration::days(7) - Duration::milliseconds(1);
    (start, end)
}

/// Whether a timestamp falls in the week window containing `now`.
pub fn in_week_of(at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let (start, end) = week_bounds(now);
    at >= start && at <= end
}

/// An entry in the weekly report.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyItem {
    pub task_id: String,
    pub text: String,
    pub fabric_id: String,
    pub at: DateTime<Utc>,
}

/// Partition of the current week's activity.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    /// Tasks completed inside the window.
    pub completed: Vec<WeeklyItem>,
    /// Tasks whose notes were touched inside the window but remain open.
    pub in_progress: Vec<WeeklyItem>,
}

/// Weekly partition across all fabrics, relative to `now`.
pub fn weekly_report(
    state: &AppState,
    catalog: &Catalog,
    fabrics: &[Fabric],
    now: DateTime<Utc>,
) -> WeeklyReport {
    let (week_start, week_end) = week_bounds(now);
    let mut completed = Vec::new();
    let mut in_progress = Vec::new();

    for fabric in fabrics {
        for task in catalog.tasks() {
            let checked = state.task_checked(&fabric.id, &task.id);
            if checked {
                if let Some(at) = state.completion_date(&fabric.id, &task.id) {
                    if at >= week_start && at <= week_end {
                        completed.push(WeeklyItem {
                            task_id: task.id.clone(),
                            text: task.text.clone(),
                            fabric_id: fabric.id.clone(),
                            at,
                        });
                    }
                }
            } else if let Some(at) = state.note_modification_date(&fabric.id, &task.id) {
                if at >= week_start && at <= week_end {
                    in_progress.push(WeeklyItem {
                        task_id: task.id.clone(),
                        text: task.text.clone(),
                        fabric_id: fabric.id.clone(),
                        at,
                    });
                }
            }
        }
    }

    completed.sort_by(|a, b| b.at.cmp(&a.at));
    in_progress.sort_by(|a, b| b.at.cmp(&a.at));

    WeeklyReport {
        week_start,
        week_end,
        completed,
        in_progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn week_starts_wednesday_ends_tuesday() {
        // 2026-03-05 is a Thursday.
        let thursday = Utc.with_ymd_and_hms(2026, 3, 5, 15, 0, 0).unwrap();
        assert_eq!(thursday.weekday(), Weekday::Thu);

        let (start, end) = week_bounds(thursday);
        assert_eq!(start.weekday(), Weekday::Wed);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());
        assert_eq!(end.weekday(), Weekday::Tue);

        // The immediately preceding Wednesday is inside the window.
        let wednesday = Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap();
        assert!(in_week_of(wednesday, thursday));

        // The preceding Tuesday belongs to the prior week.
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 3, 8, 0, 0).unwrap();
        assert!(!in_week_of(tuesday, thursday));
    }

    #[test]
    fn week_bounds_on_wednesday_start_same_day() {
        let wednesday = Utc.with_ymd_and_hms(2026, 3, 4, 1, 0, 0).unwrap();
        let (start, _) = week_bounds(wednesday);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn week_bounds_on_tuesday_reach_back_six_days() {
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(tuesday.weekday(), Weekday::Tue);
        let (start, end) = week_bounds(tuesday);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());
        assert!(end > tuesday);
    }
}
