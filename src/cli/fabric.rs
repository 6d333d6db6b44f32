//! fabtrack fabric commands implementation

use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::error::Result;
use crate::fabric::Fabric;
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct FabricList<'a> {
    current: &'a str,
    fabrics: &'a [Fabric],
}

pub fn run_list(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let current = ctx.store.current_fabric().to_string();

    let mut human = HumanOutput::new("fabtrack fabrics");
    for fabric in ctx.store.fabrics() {
        let marker = if fabric.id == current { " (current)" } else { "" };
        human.push_detail(format!(
            "{} - {} {}{marker}",
            fabric.id, fabric.name, fabric.kind
        ));
    }

    let data = FabricList {
        current: &current,
        fabrics: ctx.store.fabrics(),
    };
    emit_success(opts, "fabric list", &data, Some(&human))
}

#[derive(serde::Serialize)]
struct SwitchReport {
    previous: String,
    current: String,
}

pub fn run_switch(dir: Option<PathBuf>, id: String, opts: OutputOptions) -> Result<()> {
    let mut ctx = AppContext::load(dir)?;
    let fabric_id = ctx.resolve_fabric(Some(id))?;
    let previous = ctx.store.current_fabric().to_string();

    ctx.store.set_current_fabric(&fabric_id);
    ctx.save_state()?;

    let report = SwitchReport {
        previous,
        current: fabric_id.clone(),
    };
    let mut human = HumanOutput::new(format!("fabtrack fabric switch: {fabric_id}"));
    human.push_summary("previous", report.previous.clone());
    human.push_next_step("fabtrack status");

    emit_success(opts, "fabric switch", &report, Some(&human))
}
