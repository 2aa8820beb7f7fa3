//! Tracing subscriber setup for applications embedding the client.

use etherveil_types::{Result, VaultError};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,etherveil=debug";

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// `json` switches to one JSON object per line.
///
/// # Errors
/// Returns [`VaultError::Configuration`] if a global subscriber is already
/// installed.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| VaultError::Configuration(format!("tracing init: {e}")))
}
