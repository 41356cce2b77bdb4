//! Logging init: human-readable lines on stderr, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize logging to stderr. `verbose` raises the default level to debug.
pub fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
