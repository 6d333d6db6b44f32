//! fabtrack init command implementation
//!
//! Creates the default config and seeds the task catalog in the working
//! directory.

use std::path::PathBuf;

use crate::catalog::sample_catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct InitReport {
    dir: PathBuf,
    created_config: bool,
    created_catalog: bool,
}

pub fn run(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&dir)?;

    let config_path = dir.join("fabtrack.toml");
    let created_config = if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "fabtrack.toml exists but is not a file: {}",
                config_path.display()
            )));
        }
        false
    } else {
        Config::default().save(&config_path)?;
        true
    };

    let config = Config::load_from_dir(&dir)?;
    let catalog_path = config.catalog_path(&dir);
    let created_catalog = if catalog_path.exists() {
        false
    } else {
        sample_catalog().save(&catalog_path)?;
        true
    };

    let report = InitReport {
        dir: dir.clone(),
        created_config,
        created_catalog,
    };

    let header = if created_config || created_catalog {
        "fabtrack init: initialized"
    } else {
        "fabtrack init: nothing to do"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("dir", dir.display().to_string());
    human.push_summary(
        "config",
        if created_config { "created" } else { "exists" },
    );
    human.push_summary(
        "catalog",
        if created_catalog { "created" } else { "exists" },
    );
    human.push_next_step("fabtrack status");
    human.push_next_step("fabtrack task list");

    emit_success(opts, "init", &report, Some(&human))
}
