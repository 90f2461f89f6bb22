use std::time::Duration;

use serde::Deserialize;

use crate::errors::RelayError;

/// Where and how the relay client delivers log lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Master switch; when `false`, `send` is a no-op.
    pub enabled: bool,
    /// Listener IPv4 address or host name.
    pub host: String,
    /// Listener port.
    pub port: u16,
    /// Upper bound for establishing the connection.
    pub connect_timeout_ms: u64,
    /// Upper bound for each write and for the response read.
    pub io_timeout_ms: u64,
    /// Response bytes read before the connection is closed.
    pub max_response_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "192.168.0.240".to_string(),
            port: 1234,
            connect_timeout_ms: 2_000,
            io_timeout_ms: 2_000,
            max_response_bytes: 4096,
        }
    }
}

impl RelayConfig {
    /// Relay pointed at `host:port` with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// A config with the relay switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[inline]
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if !self.enabled {
            return Ok(());
        }
        if self.host.trim().is_empty() {
            return Err(RelayError::InvalidConfig("host is empty".into()));
        }
        if self.port == 0 {
            return Err(RelayError::InvalidConfig("port must be non-zero".into()));
        }
        if self.connect_timeout_ms == 0 || self.io_timeout_ms == 0 {
            return Err(RelayError::InvalidConfig(
                "timeouts must be non-zero; the relay must stay bounded".into(),
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(RelayError::InvalidConfig(
                "max_response_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Relay listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:1234`.
    pub bind: String,
    /// ASCII text written back after every read.
    pub reply: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:1234".to_string(),
            reply: "PONG".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RelayConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.port, 1234);
        assert_eq!(cfg.max_response_bytes, 4096);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = RelayConfig {
            io_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(RelayError::InvalidConfig(_))));
    }

    #[test]
    fn disabled_config_skips_validation() {
        let cfg = RelayConfig {
            host: String::new(),
            ..RelayConfig::disabled()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: RelayConfig = serde_json::from_str(r#"{"host":"10.0.0.7"}"#).unwrap();
        assert_eq!(cfg.host, "10.0.0.7");
        assert_eq!(cfg.port, 1234);
        assert!(cfg.enabled);
    }
}
