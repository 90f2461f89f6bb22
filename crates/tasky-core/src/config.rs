use std::time::Duration;

use serde::Deserialize;

use crate::error::CoreError;

/// Runner-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// How long `StopService` / worker replacement waits before aborting a run.
    pub stop_grace_ms: u64,
    /// Floor for the restart alarm delay.
    pub min_restart_delay_ms: u64,
    /// Capacity of the run-event bus.
    pub bus_capacity: usize,
    /// Tag deferred workers are enqueued under when the caller does not name one.
    pub worker_tag: String,
    /// Host keeps foreground services alive on its own (no wake lock, no restart alarm).
    pub native_foreground: bool,
    /// Request the weaker prerequisite capability before its "always" variant.
    pub escalate_prerequisites: bool,
    /// Visible notification for supervised services.
    pub notice: ServiceNoticeConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            stop_grace_ms: 10_000,
            min_restart_delay_ms: 60_000,
            bus_capacity: 256,
            worker_tag: "tasky-worker".to_string(),
            native_foreground: true,
            escalate_prerequisites: false,
            notice: ServiceNoticeConfig::default(),
        }
    }
}

impl RunnerConfig {
    #[inline]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    #[inline]
    pub fn min_restart_delay(&self) -> Duration {
        Duration::from_millis(self.min_restart_delay_ms)
    }

    /// Delay before the restart alarm fires: `max(interval, min_restart_delay)`.
    pub fn restart_delay(&self, interval: Option<Duration>) -> Duration {
        interval
            .unwrap_or_default()
            .max(self.min_restart_delay())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.worker_tag.trim().is_empty() {
            return Err(CoreError::Config("worker_tag is empty".into()));
        }
        if self.stop_grace_ms == 0 {
            return Err(CoreError::Config("stop_grace_ms must be non-zero".into()));
        }
        if self.min_restart_delay_ms == 0 {
            return Err(CoreError::Config(
                "min_restart_delay_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Text of the visible service notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceNoticeConfig {
    pub title: String,
    pub text: String,
    pub ticker: String,
}

impl Default for ServiceNoticeConfig {
    fn default() -> Self {
        Self {
            title: "Tasky".to_string(),
            text: "Background work is running".to_string(),
            ticker: "Tasky service".to_string(),
        }
    }
}
