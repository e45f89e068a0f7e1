//! Tracing subscriber setup.
//!
//! The provider only emits `tracing` events; installing a subscriber is the
//! host's choice. These helpers cover the two formats the platform uses.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Failure to install a global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

fn build_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| LoggingError::InvalidFilter {
            filter: filter.to_string(),
            message: e.to_string(),
        })
}

/// Human-readable output. `RUST_LOG` overrides `filter` when set.
pub fn init_logging(filter: &str) -> Result<(), LoggingError> {
    let filter_layer = build_filter(filter)?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %filter, "Logging initialized");
    Ok(())
}

/// Flattened JSON output for log aggregation.
pub fn init_json_logging(filter: &str) -> Result<(), LoggingError> {
    let filter_layer = build_filter(filter)?;
    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %filter, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_returns_error() {
        let first = init_logging("warn");
        let second = init_json_logging("warn");
        // Another test binary may have installed a subscriber already.
        if first.is_ok() {
            assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
        } else {
            assert!(second.is_err());
        }
    }
}
