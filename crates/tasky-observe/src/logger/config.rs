use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// Logger settings.
///
/// `level` is an `EnvFilter` directive string, e.g. `info` or `info,tasky=debug`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color: cfg!(test) || atty::is(atty::Stream::Stdout),
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `TASKY_LOG` (filter) and `TASKY_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LoggerError> {
        let mut cfg = Self::default();
        if let Ok(level) = std::env::var("TASKY_LOG") {
            cfg.level = level;
        }
        if let Ok(format) = std::env::var("TASKY_LOG_FORMAT") {
            cfg.format = format.parse()?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LoggerError> {
        EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|_| LoggerError::InvalidLogLevel(self.level.clone()))
    }
}
