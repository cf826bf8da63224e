//! Tracing subscriber setup

use crate::config::{LogConfig, LogFormat};
use crate::error::{LogError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    config.validate()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Plain => Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| LogError::InitializationFailed {
        message: e.to_string(),
    })?;

    tracing::info!(level = %config.level, format = ?config.format, "Tracing initialized");
    Ok(())
}
