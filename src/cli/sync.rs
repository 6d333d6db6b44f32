//! fabtrack sync command implementation
//!
//! Pushes the cached snapshot to the configured shared directory. The
//! cache holds the edits accumulated since the last sync, so the push
//! happens only when that state differs from what the remote holds. A
//! first run with no cache pulls instead: the remote's data wins, or
//! seeds from a fresh store when the remote is uninitialized.

use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::remote::FileRemote;
use crate::sync::Synchronizer;

#[derive(serde::Serialize)]
struct SyncReport {
    remote: String,
    mode: &'static str,
    pushed: bool,
}

pub fn run(dir: Option<PathBuf>, opts: OutputOptions) -> Result<()> {
    let ctx = AppContext::load(dir)?;
    let remote_dir = ctx.config.sync.remote_dir.clone().ok_or_else(|| {
        Error::InvalidConfig("sync.remote_dir is not configured".to_string())
    })?;
    let had_cache = ctx.config.cache_path(&ctx.dir).exists();

    let remote = FileRemote::new(&remote_dir);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let AppContext { store, cache, .. } = ctx;
    let mut synchronizer = Synchronizer::new(store, cache, remote);

    let (mode, pushed) = runtime.block_on(async {
        if had_cache {
            Ok::<_, Error>(("push", synchronizer.push_session().await?))
        } else {
            synchronizer.start().await?;
            Ok(("pull", synchronizer.flush().await?))
        }
    })?;

    let report = SyncReport {
        remote: remote_dir.display().to_string(),
        mode,
        pushed,
    };
    let mut human = HumanOutput::new("fabtrack sync");
    human.push_summary("remote", report.remote.clone());
    human.push_summary("mode", mode);
    human.push_summary("pushed", pushed.to_string());

    emit_success(opts, "sync", &report, Some(&human))
}
