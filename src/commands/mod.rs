//! Subcommands of the `bugs` binary.

pub mod check;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use bugs_core::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Read a program file into memory.
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read program {}", path.display()))
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true);

    // A subscriber may already be set when commands run inside tests.
    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
}
