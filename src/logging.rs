//! Console logging setup.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. Log lines go to stderr so stdout stays
/// free for the JSON reports. `RUST_LOG` overrides the default level.
pub fn init_logging(verbose: bool) -> Result<(), String> {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set default subscriber: {}", e))
}
