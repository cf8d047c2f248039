use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder};

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` (e.g. `debug`) is used, and
/// `info` when neither is present. Logs go to stderr so stdout stays free for
/// the run summary.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL")
            .ok()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing: {e}"))
}
