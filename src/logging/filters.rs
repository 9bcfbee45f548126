use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// `RUST_LOG` wins over the configured directive. An unparsable directive
/// falls back to `info`.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.build_filter_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
