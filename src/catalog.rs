//! Static checklist catalog: sections, subsections, tasks, test cases.
//!
//! The catalog is loaded once from a JSON dataset and is append-only at
//! runtime: new tasks and subsections can be added, nothing is removed.
//!
//! Task ids are derived deterministically from task text so that the same
//! text always yields the same id across catalog reloads. Two tasks with
//! identical text therefore collide; task text is expected to be unique.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fabric::{Fabric, Site};

/// Execution status of a test case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ExecutionStatus {
    /// To be executed.
    #[default]
    #[serde(rename = "T.B.E.")]
    Tbe,
    Pass,
    Fail,
    Partial,
    Defer,
    /// Requires investigation.
    #[serde(rename = "R.I.")]
    Ri,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExecutionStatus::Tbe => "T.B.E.",
            ExecutionStatus::Pass => "Pass",
            ExecutionStatus::Fail => "Fail",
            ExecutionStatus::Partial => "Partial",
            ExecutionStatus::Defer => "Defer",
            ExecutionStatus::Ri => "R.I.",
        };
        write!(f, "{label}")
    }
}

/// Test case priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TestPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// Test case risk rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Risk {
    High,
    #[default]
    Medium,
    Low,
}

/// Role of the resource leading or witnessing a test case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceRole {
    #[default]
    Ee,
    Ps,
    Sp,
    Ok,
    Vendor,
}

/// Formal verification record attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub tc_id: String,
    pub lead: ResourceRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<ResourceRole>,
    pub priority: TestPriority,
    pub risk: Risk,
    /// Estimated effort in hours.
    pub effort: f64,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_results: Option<String>,
    #[serde(default)]
    pub evidence_required: bool,
}

impl TestCase {
    pub fn new(tc_id: impl Into<String>) -> Self {
        Self {
            tc_id: tc_id.into(),
            lead: ResourceRole::default(),
            witness: None,
            priority: TestPriority::default(),
            risk: Risk::default(),
            effort: 1.0,
            status: ExecutionStatus::default(),
            dependencies: Vec::new(),
            pre_conditions: None,
            expected_results: None,
            evidence_required: false,
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_priority(mut self, priority: TestPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = status;
        self
    }
}

/// A unit of deployment work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub fabric_specific: bool,
    pub ndo_centralized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case: Option<TestCase>,
}

impl Task {
    /// Build a task, deriving its id from the text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: task_id_for(&text),
            text,
            fabric_specific: false,
            ndo_centralized: false,
            test_case: None,
        }
    }

    pub fn fabric_specific(mut self) -> Self {
        self.fabric_specific = true;
        self
    }

    pub fn ndo_centralized(mut self) -> Self {
        self.ndo_centralized = true;
        self
    }

    pub fn with_test_case(mut self, test_case: TestCase) -> Self {
        self.test_case = Some(test_case);
        self
    }

    /// Whether this task applies to the given fabric.
    ///
    /// Exactly one of three rules holds: fabric-specific tasks apply to
    /// every fabric, NDO-centralized tasks apply only to Tertiary-site
    /// fabrics, and tasks with neither flag apply universally.
    pub fn applies_to(&self, fabric: &Fabric) -> bool {
        self.fabric_specific
            || (self.ndo_centralized && fabric.site == Site::Tertiary)
            || (!self.fabric_specific && !self.ndo_centralized)
    }
}

/// Derive the stable task id for a piece of task text.
///
/// Reproduces the 32-bit string hash used by the original dataset
/// (UTF-16 code units, `h = (h << 5) - h + c` with 32-bit truncation),
/// rendered as `task-<abs(hash) base36>`. Editing a task's text changes
/// its identity; that is the intended behavior.
pub fn task_id_for(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        let wide = (hash as i64) * 31 + i64::from(unit);
        hash = wide as i32;
    }
    format!("task-{}", to_base36((hash as i64).unsigned_abs()))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Named group of tasks within a section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subsection {
    pub title: String,
    pub tasks: Vec<Task>,
}

/// Top-level checklist section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub subsections: Vec<Subsection>,
}

/// The full task catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Catalog {
    pub sections: Vec<Section>,
}

impl Catalog {
    /// Load a catalog from a JSON dataset file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::CatalogNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    /// Save the catalog as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Iterate over every task in catalog order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.sections
            .iter()
            .flat_map(|section| section.subsections.iter())
            .flat_map(|subsection| subsection.tasks.iter())
    }

    /// Find a task by id.
    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks().find(|task| task.id == task_id)
    }

    /// Find a task by the id of its embedded test case.
    pub fn find_task_by_tc(&self, tc_id: &str) -> Option<&Task> {
        self.tasks().find(|task| {
            task.test_case
                .as_ref()
                .is_some_and(|tc| tc.tc_id == tc_id)
        })
    }

    /// Append a task to a subsection, creating the subsection if needed.
    ///
    /// Append-only: existing tasks are never removed or replaced. Returns
    /// the id of the appended task.
    pub fn add_task(
        &mut self,
        section_id: &str,
        subsection_title: &str,
        task: Task,
    ) -> Result<String> {
        let section = self
            .sections
            .iter_mut()
            .find(|section| section.id == section_id)
            .ok_or_else(|| Error::UnknownSection(section_id.to_string()))?;

        let task_id = task.id.clone();
        match section
            .subsections
            .iter_mut()
            .find(|subsection| subsection.title == subsection_title)
        {
            Some(subsection) => subsection.tasks.push(task),
            None => section.subsections.push(Subsection {
                title: subsection_title.to_string(),
                tasks: vec![task],
            }),
        }
        Ok(task_id)
    }

    /// Append an empty subsection to a section.
    pub fn add_subsection(&mut self, section_id: &str, title: &str) -> Result<()> {
        let section = self
            .sections
            .iter_mut()
            .find(|section| section.id == section_id)
            .ok_or_else(|| Error::UnknownSection(section_id.to_string()))?;

        section.subsections.push(Subsection {
            title: title.to_string(),
            tasks: Vec::new(),
        });
        Ok(())
    }
}

/// Small builtin catalog used to seed `fabtrack init` and tests.
pub fn sample_catalog() -> Catalog {
    Catalog {
        sections: vec![
            Section {
                id: "section1".to_string(),
                title: "1. Pre-Deployment Planning".to_string(),
                subsections: vec![Subsection {
                    title: "Non-Technical Tasks".to_string(),
                    tasks: vec![
                        Task::new("Define project scope and objectives for multi-site deployment"),
                        Task::new("Establish project timeline and milestones"),
                        Task::new("Identify stakeholders and communication plan"),
                    ],
                }],
            },
            Section {
                id: "section2".to_string(),
                title: "2. Fabric Bring-Up".to_string(),
                subsections: vec![Subsection {
                    title: "Fabric Configuration".to_string(),
                    tasks: vec![
                        Task::new("Configure fabric access policies")
                            .fabric_specific()
                            .with_test_case(TestCase::new("TC-ACC-001")),
                        Task::new("Verify fabric connectivity end to end")
                            .fabric_specific()
                            .with_test_case(
                                TestCase::new("TC-CON-001")
                                    .with_priority(TestPriority::High)
                                    .with_dependencies(&["TC-ACC-001"]),
                            ),
                        Task::new("Deploy centralized orchestrator templates")
                            .ndo_centralized()
                            .with_test_case(TestCase::new("TC-NDO-001")),
                    ],
                }],
            },
        ],
    }
}
