//! Tracing initialisation shared by DevAssist binaries

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;
use crate::errors::{AppError, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Logs go to stderr so
/// that stdout stays free for command output.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| AppError::Configuration {
            message: format!("invalid log level '{}': {}", config.log_level, e),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| AppError::Internal {
        message: format!("failed to install tracing subscriber: {}", e),
    })?;

    tracing::debug!(service = %config.service_name, "Tracing initialised");
    Ok(())
}
