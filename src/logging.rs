//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise `level` (e.g. "info" or
/// "harness_oxide=debug") is used.
pub fn init(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::configuration(format!("Invalid log level '{}': {}", level, e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))
}
