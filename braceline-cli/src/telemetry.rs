//! Log subscriber initialisation for the CLI

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber writing to stderr
///
/// With no `-v` flags the filter comes from `RUST_LOG`, falling back to
/// `warn`. Each `-v` raises the level: info, debug, then trace.
pub fn initialise(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        // Keep colour codes out of redirected output
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}
