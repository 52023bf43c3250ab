//! Tracing initialization: a `RUST_LOG`-driven `EnvFilter` with a
//! crate-specific default.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_LEVEL: &str = "info,concur_cli=debug";

fn build_env_filter() -> EnvFilter {
    std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs a process-wide `tracing` subscriber reading `RUST_LOG`,
/// defaulting to [`DEFAULT_LOG_LEVEL`] when unset.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
