use std::{fmt, path::PathBuf, str::FromStr};

use kvscan_error::{GenericError, KvResult, StatusCode};
use serde::{Deserialize, Serialize};

/// Console output layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = kvscan_error::StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(GenericError::new(
                StatusCode::InvalidConfig,
                format!("unknown log format {other:?}"),
            )
            .into()),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Logging setup.
///
/// `level` is either a bare level (`info`, `debug`, ...) applied to this
/// crate, or a full filter directive such as `kvscan=trace,warn`. A file
/// sink is added only when `log_dir` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub log_dir: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            log_dir: None,
            file_name: "kvscan.log".to_string(),
        }
    }
}

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl LoggingConfig {
    fn is_bare_level(&self) -> bool {
        LEVELS.contains(&self.level.to_ascii_lowercase().as_str())
    }

    /// Filter directive for the subscriber.
    pub fn build_filter_directive(&self) -> String {
        if self.is_bare_level() {
            format!("warn,kvscan={}", self.level.to_ascii_lowercase())
        } else {
            self.level.clone()
        }
    }

    pub fn validate(&self) -> KvResult<()> {
        if self.level.trim().is_empty() {
            kvscan_error::bail!(StatusCode::InvalidConfig, "log level must not be empty");
        }
        if self.file_name.trim().is_empty() {
            kvscan_error::bail!(StatusCode::InvalidConfig, "log file name must not be empty");
        }
        Ok(())
    }

    /// Creates the log directory when a file sink is configured.
    pub fn ensure_log_dir(&self) -> KvResult<()> {
        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_scopes_to_crate() {
        let cfg = LoggingConfig {
            level: "DEBUG".into(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "warn,kvscan=debug");
    }

    #[test]
    fn test_full_directive_passes_through() {
        let cfg = LoggingConfig {
            level: "kvscan::cursor=trace,info".into(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "kvscan::cursor=trace,info");
    }

    #[test]
    fn test_validate_rejects_empty_level() {
        let cfg = LoggingConfig {
            level: " ".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Compact.to_string(), "compact");
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_ensure_log_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        let cfg = LoggingConfig {
            log_dir: Some(dir.clone()),
            ..Default::default()
        };
        cfg.ensure_log_dir().unwrap();
        assert!(dir.is_dir());
    }
}
