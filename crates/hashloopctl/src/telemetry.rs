//! Logging setup for the `hashloop` CLI.
//!
//! Installs a console `tracing-subscriber` with an `EnvFilter`. `RUST_LOG`
//! takes precedence over the configured level. Logs go to stderr so they
//! never mix with lookup results on stdout.

use tracing_subscriber::EnvFilter;

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Call this once at startup, before any `tracing` events are emitted.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
