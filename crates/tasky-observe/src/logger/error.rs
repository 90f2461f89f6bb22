use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid logger format: {0} (expected: text|json|journald)")]
    InvalidFormat(String),
    #[error("journald is not supported on this platform or the feature is disabled")]
    JournaldNotSupported,
    #[error("logger has already been initialized")]
    AlreadyInitialized,
    #[error("failed to initialize logger: {0}")]
    InitializationFailed(String),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

impl LoggerError {
    pub fn as_label(&self) -> &'static str {
        match self {
            LoggerError::InvalidFormat(_) => "logger_invalid_format",
            LoggerError::JournaldNotSupported => "logger_journald_unsupported",
            LoggerError::AlreadyInitialized => "logger_already_initialized",
            LoggerError::InitializationFailed(_) => "logger_init_failed",
            LoggerError::InvalidLogLevel(_) => "logger_invalid_level",
        }
    }
}
