use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DurationMs;

/// How often a work unit runs.
///
/// - `interval_ms = None` → run exactly once;
/// - `interval_ms = Some(n)` → run, sleep `n` ms, repeat until cancelled.
///
/// A zero interval is normalized to "once".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval_ms: Option<DurationMs>,
}

impl Schedule {
    /// Single invocation.
    pub const fn once() -> Self {
        Self { interval_ms: None }
    }

    /// Repeat with `interval` between the end of one iteration and the start of the next.
    pub fn every(interval: Duration) -> Self {
        Self::every_ms(interval.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    /// Same as [`Schedule::every`] with a millisecond value.
    pub const fn every_ms(ms: DurationMs) -> Self {
        if ms == 0 {
            Self::once()
        } else {
            Self {
                interval_ms: Some(ms),
            }
        }
    }

    /// Delay between iterations, `None` for one-shot schedules.
    #[inline]
    pub fn interval(&self) -> Option<Duration> {
        self.interval_ms.map(Duration::from_millis)
    }

    #[inline]
    pub fn interval_ms(&self) -> Option<DurationMs> {
        self.interval_ms
    }

    #[inline]
    pub fn is_once(&self) -> bool {
        self.interval_ms.is_none()
    }
}

impl From<Option<Duration>> for Schedule {
    fn from(interval: Option<Duration>) -> Self {
        interval.map(Schedule::every).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_once() {
        assert!(Schedule::every(Duration::ZERO).is_once());
        assert!(Schedule::every_ms(0).is_once());
    }

    #[test]
    fn interval_is_preserved() {
        let s = Schedule::every(Duration::from_secs(5));
        assert_eq!(s.interval(), Some(Duration::from_millis(5_000)));
        assert!(!s.is_once());
    }

    #[test]
    fn from_option() {
        assert_eq!(Schedule::from(None), Schedule::once());
        assert_eq!(
            Schedule::from(Some(Duration::from_millis(250))),
            Schedule::every_ms(250)
        );
    }

    #[test]
    fn once_serializes_without_interval() {
        let json = serde_json::to_string(&Schedule::once()).unwrap();
        assert_eq!(json, "{}");

        let json = serde_json::to_string(&Schedule::every_ms(1500)).unwrap();
        assert_eq!(json, r#"{"intervalMs":1500}"#);
    }
}
