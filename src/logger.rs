//! Tracing subscriber setup driven by [`config::Logger`].

use tracing_subscriber::{fmt, EnvFilter};

use crate::{config, Error, Result};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. Calling this again after a
/// subscriber is installed is a no-op.
///
/// # Errors
/// When the configured level cannot be turned into a filter directive.
pub fn init(config: &config::Logger) -> Result<()> {
    if !config.enable {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.as_str())
            .map_err(|err| Error::Logger(err.to_string()))?,
    };

    let builder = fmt().with_env_filter(filter);
    let installed = match config.format {
        config::LogFormat::Compact => builder.compact().try_init(),
        config::LogFormat::Pretty => builder.pretty().try_init(),
        config::LogFormat::Json => builder.json().try_init(),
    };

    if installed.is_err() {
        tracing::debug!("logger_already_initialized");
    }
    Ok(())
}
