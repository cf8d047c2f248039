use std::process::ExitCode;

use anyhow::Result;
use tracing::error;

use sofa_ingest::config::{self, SnapshotConfig};
use sofa_ingest::http_client::HttpApi;
use sofa_ingest::snapshot::{self, SnapshotSummary};
use sofa_ingest::{logging, signal};

fn main() -> ExitCode {
    config::load_dotenv();
    if let Err(err) = logging::init_tracing() {
        eprintln!("{err:#}");
    }
    if let Err(err) = signal::install_interrupt_handler() {
        error!("{err:#}");
    }

    match run() {
        Ok(summary) => {
            println!("Snapshot complete. Root: {}", summary.root.display());
            println!("Index: {}", summary.index_path.display());
            println!(
                "Files: {} ({} failed calls)",
                summary.files_written, summary.failed_calls
            );
            println!(
                "Entities: events={} players={} tournaments={} seasons={}",
                summary.entities.events.len(),
                summary.entities.players.len(),
                summary.entities.tournaments.len(),
                summary.entities.seasons.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("fatal: {err:?}");
            eprintln!("Fatal error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<SnapshotSummary> {
    let config = SnapshotConfig::from_env();
    println!("API_BASE={}", config.api.base_url);
    let api = HttpApi::new(&config.api)?;
    snapshot::run(&api, &config)
}
