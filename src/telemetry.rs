use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::TelemetryConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter { value: String, source: ParseError },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Installs the global fmt subscriber. A non-empty `RUST_LOG` wins over
/// `APP_LOG_LEVEL`.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(rust_log.as_deref(), &config.log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// An unparsable `RUST_LOG` falls back to the configured level; an
/// unparsable configured level is an error.
pub(crate) fn build_filter(
    rust_log: Option<&str>,
    configured: &str,
) -> Result<EnvFilter, TelemetryError> {
    if let Some(filter) = rust_log
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return Ok(filter);
    }

    EnvFilter::try_new(configured.trim()).map_err(|source| TelemetryError::EnvFilter {
        value: configured.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_configured_level() {
        let filter = build_filter(Some("homeloan=debug"), "info").expect("valid filter");
        assert_eq!(filter.to_string(), "homeloan=debug");
    }

    #[test]
    fn blank_rust_log_uses_configured_level() {
        let filter = build_filter(Some("   "), "warn").expect("valid filter");
        assert_eq!(filter.to_string(), "warn");
        let filter = build_filter(None, " error ").expect("valid filter");
        assert_eq!(filter.to_string(), "error");
    }

    #[test]
    fn invalid_configured_level_is_reported() {
        let err = build_filter(None, "homeloan=loudest").expect_err("bad level");
        assert!(matches!(err, TelemetryError::EnvFilter { ref value, .. } if value == "homeloan=loudest"));
    }
}
