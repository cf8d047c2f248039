use std::thread;

use anyhow::{Context, Result};
use tracing::warn;

pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Spawns a watcher thread that exits the process with status 130 on Ctrl-C.
///
/// The ingest loops are blocking, so the watcher owns a small current-thread
/// runtime just for `ctrl_c`. Per-step transactions that are open at that point
/// are never committed.
pub fn install_interrupt_handler() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted");
                    eprintln!("Interrupted");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            });
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}
