//! Support for tracing execution of a program.

use tracing_subscriber::{fmt::Subscriber, prelude::*, EnvFilter};

/// Environment variable holding the log filter, e.g. `PIER_LOG=pier=debug`.
pub const LOG_ENV: &str = "PIER_LOG";

/// Set up the `tracing` library. Everything goes to stderr so stdout carries
/// only the kubeconfig.
pub fn initialize_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish()
        .init();
}
