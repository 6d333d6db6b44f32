//! Command-line interface for fabtrack
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use clap::{Parser, Subcommand};

use crate::catalog::ExecutionStatus;
use crate::error::{Error, Result};
use crate::state::{Category, KanbanLane};

mod checklist;
mod comment;
pub(crate) mod context;
mod fabric;
mod init;
mod report;
mod status;
mod sync;
mod task;
mod testcase;

/// fabtrack - Fabric deployment checklist tracking
///
/// Tracks deployment tasks, test-case execution, and notes across six
/// network fabrics, with a local snapshot cache and optional remote sync.
#[derive(Parser, Debug)]
#[command(name = "fabtrack")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Working directory holding fabtrack.toml, catalog, and cache
    #[arg(long, global = true, env = "FABTRACK_DIR")]
    pub dir: Option<std::path::PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize config and catalog in the working directory
    Init,

    /// Show progress for a fabric
    Status {
        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },

    /// Fabric management
    #[command(subcommand)]
    Fabric(FabricCommands),

    /// Task operations
    #[command(subcommand)]
    Task(TaskCommands),

    /// Test-case execution status
    #[command(subcommand)]
    Test(TestCommands),

    /// Catalog subsection management
    #[command(subcommand)]
    Subsection(SubsectionCommands),

    /// Saved sub-checklist management
    #[command(subcommand)]
    Checklist(ChecklistCommands),

    /// List completed tasks across all fabrics, newest first
    Completed,

    /// Weekly activity report (Wednesday through Tuesday)
    Week,

    /// Comments and mentions
    #[command(subcommand)]
    Comment(CommentCommands),

    /// Mention notifications
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Push the cached snapshot to the configured remote
    Sync,
}

/// Fabric subcommands
#[derive(Subcommand, Debug)]
pub enum FabricCommands {
    /// List the six fabrics
    List,

    /// Switch the current fabric
    Switch {
        /// Fabric id (e.g., north-it, tertiary-ot)
        id: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks applicable to a fabric with their overlay state
    List {
        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },

    /// Mark a task complete (blocked while prerequisites are unmet)
    Check {
        /// Task id or test-case id
        task: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,

        /// Apply across these fabrics instead (comma-separated)
        #[arg(long, value_delimiter = ',')]
        fabrics: Vec<String>,
    },

    /// Mark a task incomplete
    Uncheck {
        /// Task id or test-case id
        task: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,

        /// Apply across these fabrics instead (comma-separated)
        #[arg(long, value_delimiter = ',')]
        fabrics: Vec<String>,
    },

    /// Set a task's notes
    Note {
        /// Task id or test-case id
        task: String,

        /// Note text (empty clears the note)
        text: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },

    /// Set a task's category: must-have, should-have, none
    Category {
        /// Task id or test-case id
        task: String,

        /// Category
        category: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,

        /// Apply across these fabrics instead (comma-separated)
        #[arg(long, value_delimiter = ',')]
        fabrics: Vec<String>,
    },

    /// Move a task on the kanban board: todo, in-progress, testing, complete
    Kanban {
        /// Task id or test-case id
        task: String,

        /// Lane
        lane: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },

    /// Append a new task to the catalog
    Add {
        /// Task text; the id is derived from it
        text: String,

        /// Section id
        #[arg(long)]
        section: String,

        /// Subsection title (created if missing)
        #[arg(long)]
        subsection: String,

        /// Task applies to every fabric individually
        #[arg(long)]
        fabric_specific: bool,

        /// Task is centralized and applies to Tertiary fabrics only
        #[arg(long, conflicts_with = "fabric_specific")]
        ndo: bool,
    },

    /// Show prerequisite status for a task
    Deps {
        /// Task id or test-case id
        task: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },

    /// Copy task state from one fabric onto others
    Clone {
        /// Task ids to copy
        #[arg(required = true, value_delimiter = ',')]
        tasks: Vec<String>,

        /// Source fabric (defaults to the current fabric)
        #[arg(long)]
        from: Option<String>,

        /// Target fabrics (comma-separated)
        #[arg(long, required = true, value_delimiter = ',')]
        to: Vec<String>,
    },
}

/// Test-case subcommands
#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Set a test case's execution status on a fabric
    Set {
        /// Test-case id (e.g., TC-ACC-001)
        tc_id: String,

        /// Status: tbe, pass, fail, partial, defer, ri
        status: String,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },
}

/// Subsection subcommands
#[derive(Subcommand, Debug)]
pub enum SubsectionCommands {
    /// Append an empty subsection to a section
    Add {
        /// Subsection title
        title: String,

        /// Section id
        #[arg(long)]
        section: String,
    },
}

/// Checklist subcommands
#[derive(Subcommand, Debug)]
pub enum ChecklistCommands {
    /// Save a named sub-checklist from the current fabric's tasks
    Save {
        /// Checklist name
        name: String,

        /// Task ids to include (comma-separated)
        #[arg(long, required = true, value_delimiter = ',')]
        tasks: Vec<String>,
    },

    /// Delete a saved sub-checklist
    Delete {
        /// Checklist name
        name: String,
    },

    /// List saved sub-checklists
    List,
}

/// Comment subcommands
#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Add a comment to a task; @[Name](id) markup mentions users
    Add {
        /// Task id or test-case id
        task: String,

        /// Comment text
        text: String,

        /// Parent comment id for replies
        #[arg(long)]
        parent: Option<String>,

        /// Fabric id (defaults to the current fabric)
        #[arg(long)]
        fabric: Option<String>,
    },

    /// List comments on a task
    List {
        /// Task id or test-case id
        task: String,
    },
}

/// Notification subcommands
#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// List unread mention notifications
    List,

    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },

    /// Clear all notifications
    Clear,
}

pub(crate) fn parse_category(value: &str) -> Result<Category> {
    match value.to_lowercase().as_str() {
        "must-have" => Ok(Category::MustHave),
        "should-have" => Ok(Category::ShouldHave),
        "none" => Ok(Category::None),
        _ => Err(Error::InvalidArgument(format!(
            "invalid category '{value}': must be must-have, should-have, or none"
        ))),
    }
}

pub(crate) fn parse_lane(value: &str) -> Result<KanbanLane> {
    match value.to_lowercase().as_str() {
        "todo" => Ok(KanbanLane::Todo),
        "in-progress" => Ok(KanbanLane::InProgress),
        "testing" => Ok(KanbanLane::Testing),
        "complete" => Ok(KanbanLane::Complete),
        _ => Err(Error::InvalidArgument(format!(
            "invalid lane '{value}': must be todo, in-progress, testing, or complete"
        ))),
    }
}

pub(crate) fn parse_status(value: &str) -> Result<ExecutionStatus> {
    match value.to_lowercase().as_str() {
        "tbe" | "t.b.e." => Ok(ExecutionStatus::Tbe),
        "pass" => Ok(ExecutionStatus::Pass),
        "fail" => Ok(ExecutionStatus::Fail),
        "partial" => Ok(ExecutionStatus::Partial),
        "defer" => Ok(ExecutionStatus::Defer),
        "ri" | "r.i." => Ok(ExecutionStatus::Ri),
        _ => Err(Error::InvalidArgument(format!(
            "invalid status '{value}': must be tbe, pass, fail, partial, defer, or ri"
        ))),
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let opts = crate::output::OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::Init => init::run(self.dir, opts),
            Commands::Status { fabric } => status::run(self.dir, fabric, opts),
            Commands::Fabric(cmd) => match cmd {
                FabricCommands::List => fabric::run_list(self.dir, opts),
                FabricCommands::Switch { id } => fabric::run_switch(self.dir, id, opts),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::List { fabric } => task::run_list(self.dir, fabric, opts),
                TaskCommands::Check {
                    task,
                    fabric,
                    fabrics,
                } => task::run_set_state(self.dir, task, true, fabric, fabrics, opts),
                TaskCommands::Uncheck {
                    task,
                    fabric,
                    fabrics,
                } => task::run_set_state(self.dir, task, false, fabric, fabrics, opts),
                TaskCommands::Note { task, text, fabric } => {
                    task::run_note(self.dir, task, text, fabric, opts)
                }
                TaskCommands::Category {
                    task,
                    category,
                    fabric,
                    fabrics,
                } => task::run_category(self.dir, task, category, fabric, fabrics, opts),
                TaskCommands::Kanban { task, lane, fabric } => {
                    task::run_kanban(self.dir, task, lane, fabric, opts)
                }
                TaskCommands::Add {
                    text,
                    section,
                    subsection,
                    fabric_specific,
                    ndo,
                } => task::run_add(
                    self.dir,
                    task::AddOptions {
                        text,
                        section,
                        subsection,
                        fabric_specific,
                        ndo,
                    },
                    opts,
                ),
                TaskCommands::Deps { task, fabric } => {
                    task::run_deps(self.dir, task, fabric, opts)
                }
                TaskCommands::Clone { tasks, from, to } => {
                    task::run_clone(self.dir, tasks, from, to, opts)
                }
            },
            Commands::Test(cmd) => match cmd {
                TestCommands::Set {
                    tc_id,
                    status,
                    fabric,
                } => testcase::run_set(self.dir, tc_id, status, fabric, opts),
            },
            Commands::Subsection(cmd) => match cmd {
                SubsectionCommands::Add { title, section } => {
                    task::run_add_subsection(self.dir, section, title, opts)
                }
            },
            Commands::Checklist(cmd) => match cmd {
                ChecklistCommands::Save { name, tasks } => {
                    checklist::run_save(self.dir, name, tasks, opts)
                }
                ChecklistCommands::Delete { name } => {
                    checklist::run_delete(self.dir, name, opts)
                }
                ChecklistCommands::List => checklist::run_list(self.dir, opts),
            },
            Commands::Completed => report::run_completed(self.dir, opts),
            Commands::Week => report::run_week(self.dir, opts),
            Commands::Comment(cmd) => match cmd {
                CommentCommands::Add {
                    task,
                    text,
                    parent,
                    fabric,
                } => comment::run_add(self.dir, task, text, parent, fabric, opts),
                CommentCommands::List { task } => comment::run_list(self.dir, task, opts),
            },
            Commands::Notify(cmd) => match cmd {
                NotifyCommands::List => comment::run_notify_list(self.dir, opts),
                NotifyCommands::Read { id } => comment::run_notify_read(self.dir, id, opts),
                NotifyCommands::Clear => comment::run_notify_clear(self.dir, opts),
            },
            Commands::Sync => sync::run(self.dir, opts),
        }
    }
}
