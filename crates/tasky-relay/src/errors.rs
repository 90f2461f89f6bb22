use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to connect to relay listener: {0}")]
    Connect(#[source] std::io::Error),

    #[error("relay {stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("relay io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid relay config: {0}")]
    InvalidConfig(String),
}

impl RelayError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RelayError::Connect(_) => "relay_connect",
            RelayError::Timeout { .. } => "relay_timeout",
            RelayError::Io(_) => "relay_io",
            RelayError::InvalidConfig(_) => "relay_invalid_config",
        }
    }
}
