#![forbid(unsafe_code)]

//! Structured JSON logging for production hosts.
//!
//! The filter is read from `RUST_LOG`; when unset, `hookwire=info` is used.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "hookwire=info,hookwire_core=info,hookwire_runtime=info";

/// Install a global JSON `tracing` subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_json_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .try_init()
}
