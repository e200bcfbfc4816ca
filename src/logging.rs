use anyhow::{anyhow, Context};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Route `tracing` output to `path`. The terminal is in raw mode while the app runs,
/// so nothing is ever written to stdout. `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub fn init(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {e}"))
}
