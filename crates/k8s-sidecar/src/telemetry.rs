//! Process-wide tracing setup.

use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::{LogConfig, LogFormat};
use crate::error::TelemetryError;

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured default filter. Records
/// emitted through the `log` crate by dependencies are forwarded as well.
pub fn init_tracing(config: &LogConfig) -> Result<(), TelemetryError> {
    LogTracer::init()?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)?,
    };

    match config.format {
        LogFormat::Text => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(false));
            set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = Registry::default().with(filter).with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_span_list(false),
            );
            set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_default_filter_is_rejected() {
        assert!(EnvFilter::try_new("k8s_sidecar=loudest").is_err());
        assert!(EnvFilter::try_new(&LogConfig::default().default_filter).is_ok());
    }
}
