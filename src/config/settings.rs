use std::{path::Path, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use kvscan_error::{GenericError, KvResult, StackError, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    client::ClientOptions,
    logging::{LogFormat, LoggingConfig},
};

/// Process settings.
///
/// Sources, later ones winning: built-in defaults, an optional file, then
/// `KVSCAN_*` environment variables (`KVSCAN_TIMEOUT_MS=500`,
/// `KVSCAN_SCAN_COUNT=100`, `KVSCAN_LOG_LEVEL=debug`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Completion wait limit in milliseconds, `0` to wait indefinitely.
    pub timeout_ms: u64,
    /// Default `COUNT` hint for scans.
    #[serde(default)]
    pub scan_count: Option<u64>,
    pub log_level: String,
    pub log_format: LogFormat,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn config_error(err: ConfigError) -> StackError {
    GenericError::new(StatusCode::InvalidConfig, err.to_string()).into()
}

impl Settings {
    /// Loads settings from defaults and the environment only.
    pub fn load() -> KvResult<Self> {
        Self::load_from(None)
    }

    /// Loads settings, reading `path` (format picked by extension) between
    /// the defaults and the environment.
    pub fn load_from(path: Option<&Path>) -> KvResult<Self> {
        let mut builder = Config::builder()
            .set_default("timeout_ms", 30_000)
            .and_then(|b| b.set_default("log_level", "info"))
            .and_then(|b| b.set_default("log_format", "pretty"))
            .map_err(config_error)?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix("KVSCAN").try_parsing(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> KvResult<()> {
        kvscan_error::ensure!(
            self.scan_count != Some(0),
            StatusCode::InvalidConfig,
            "scan_count must be positive"
        );
        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            scan_count: self.scan_count,
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            log_dir: self.log_dir.clone(),
            ..LoggingConfig::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            scan_count: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_dir: None,
        }
    }
}
