//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{Error, Result};

/// Filter used when neither `RUST_LOG` nor a configured filter is present.
pub const DEFAULT_LOG_FILTER: &str = "info,renderer_instancing=debug";

/// Initialize the logging system with tracing.
///
/// This sets up tracing-subscriber with:
/// - Environment-based filtering (RUST_LOG)
/// - Target and thread ids on every line
///
/// # Panics
///
/// Panics if a global subscriber has already been installed. Use
/// [`try_init_logging`] when that can happen (tests, embedding hosts).
///
/// # Example
/// ```
/// renderer_core::init_logging();
/// tracing::info!("Renderer initialized");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Installs the global subscriber with `filter` unless `RUST_LOG` is set.
///
/// Returns [`Error::Logging`] for an unparsable filter or when another
/// subscriber is already active.
pub fn try_init_logging(filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter)
            .map_err(|e| Error::Logging(format!("invalid filter {filter:?}: {e}")))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_second_init_reports_error() {
        // Whichever call wins the race, at most one can succeed.
        let first = try_init_logging(DEFAULT_LOG_FILTER);
        let second = try_init_logging(DEFAULT_LOG_FILTER);
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(Error::Logging(_))));
    }
}
