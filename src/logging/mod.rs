//! Logging setup on top of `tracing-subscriber`.

pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use kvscan_error::{GenericError, KvResult, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: console output in the configured layout
/// plus an optional daily-rolling file sink.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> KvResult<LoggingHandle> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = vec![formatter::console_layer(config.format)];

    let file_guard = match &config.log_dir {
        Some(dir) => {
            let (layer, guard) = formatter::file_layer(dir, &config.file_name);
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| GenericError::new(StatusCode::InvalidConfig, e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = %config.format,
        file_sink = file_guard.is_some(),
        "Logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
