use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::error;

use sofa_ingest::bootstrap::{self, RunSummary, StepOutcome};
use sofa_ingest::config::{self, BootstrapConfig};
use sofa_ingest::http_client::HttpApi;
use sofa_ingest::{logging, schema, signal};

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
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("fatal: {err:?}");
            eprintln!("Fatal error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<RunSummary> {
    let config = BootstrapConfig::from_env();
    println!("API_BASE={}", config.api.base_url);

    let mut conn = schema::open_db(&config.db).context("unable to open database")?;
    let api = HttpApi::new(&config.api)?;
    bootstrap::run(&mut conn, &api, &config)
}

fn print_summary(summary: &RunSummary) {
    println!("Bootstrap complete");
    if let Some(run_id) = summary.run_id {
        println!("Run: {run_id}");
    }
    println!(
        "Scheduled events ({}): {} found, {} processed",
        summary.schedule_date,
        summary.events_scheduled,
        summary.events_processed.len()
    );
    println!(
        "Steps: {} done, {} skipped, {} failed",
        summary.steps_done(),
        summary.steps_skipped(),
        summary.steps_failed()
    );
    println!("Rows written: {}", summary.rows_written());
    for report in &summary.steps {
        if let StepOutcome::Failed { reason } = &report.outcome {
            println!("failed {}: {}", report.step, reason);
        }
    }
}
