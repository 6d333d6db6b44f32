//! fabtrack - Fabric Deployment Checklist Library
//!
//! This library provides the core functionality for the fabtrack CLI
//! tool, tracking deployment checklists across six network fabrics.
//!
//! # Core Concepts
//!
//! - **Fabrics**: Six fixed deployment targets (three sites, IT and OT)
//! - **Catalog**: Sectioned task checklist with embedded test cases
//! - **State Store**: Per-fabric overlay state driven by a pure reducer
//! - **Dependency Gating**: Tasks blocked until prerequisite test cases pass
//! - **Synchronizer**: Local cache write-through plus interval remote push
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `fabtrack.toml`
//! - `error`: Error types and result aliases
//! - `fabric`: The fixed fabric set
//! - `catalog`: Task catalog, test cases, and deterministic task ids
//! - `state`: Application state and reducer
//! - `store`: Validated mutations over the state
//! - `deps`: Prerequisite gating for task completion
//! - `progress`: Aggregate views and the weekly report window
//! - `comment`: Comments, mentions, and notifications
//! - `snapshot`: The persisted wire-format snapshot
//! - `cache`: Local snapshot cache with locked atomic writes
//! - `remote`: Remote store contract and transports
//! - `realtime`: Broadcast update channel
//! - `sync`: The dual-path persistence synchronizer

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod comment;
pub mod config;
pub mod deps;
pub mod error;
pub mod fabric;
pub mod output;
pub mod progress;
pub mod realtime;
pub mod remote;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
