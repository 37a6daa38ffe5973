//! Sets up logging for the command line front end.
//!
//! The filter comes from `--log-level` when given, otherwise from `RUST_LOG`,
//! otherwise defaults to `warn`. Logs go to stderr so stdout only carries results.

use tracing_subscriber::filter::{EnvFilter, ParseError};

const DEFAULT_LEVEL: &str = "warn";

/// Builds the filter from an explicit level or directive such as `debug` or
/// `rule_engine=trace`.
pub fn env_filter(level: Option<&str>) -> Result<EnvFilter, ParseError> {
    match level {
        Some(level) => EnvFilter::try_new(level),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}

pub fn setup_logging(level: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}
