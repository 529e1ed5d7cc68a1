//! Diagnostics for the runner.
//!
//! Levels come from `--debug`/`--info`, then `RUST_LOG`, and default to
//! `warn`. Output goes to stderr unless a log file is given. While the
//! terminal UI owns the screen logs always go to a file.

use std::{fs::File, path::Path, sync::Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init(level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let (stderr, file) = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            (None, Some(layer))
        }
        None => (Some(fmt::layer().with_writer(std::io::stderr).compact()), None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .context("cannot install the log subscriber")
}
