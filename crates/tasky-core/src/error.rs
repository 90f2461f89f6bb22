//! Error types for work units, host collaborators and the runner facade.
//!
//! - [`WorkError`] is what a work unit returns.
//! - [`HostError`] is what a platform collaborator returns.
//! - [`CoreError`] is what the facade and strategies return.
//!
//! All of them expose `as_label` for structured logs.

use tasky_model::{Capability, DenialReason, PermissionStatus, SlotKind};
use thiserror::Error;

/// Failure of a single work unit invocation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// The work failed; a later launch may succeed.
    #[error("execution failed: {reason}")]
    Fail { reason: String },

    /// The work failed in a way a relaunch will not fix.
    #[error("fatal error: {reason}")]
    Fatal { reason: String },

    /// The work observed its cancellation signal and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl WorkError {
    pub fn fail(reason: impl Into<String>) -> Self {
        WorkError::Fail {
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        WorkError::Fatal {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Fatal { .. } => "work_fatal",
            WorkError::Canceled => "work_canceled",
        }
    }
}

/// A capability the user or OS did not grant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission {capability} denied ({reason}), status {status:?}")]
pub struct PermissionDenied {
    pub capability: Capability,
    pub reason: DenialReason,
    pub status: PermissionStatus,
}

impl PermissionDenied {
    /// `true` when prompting again is pointless and the user must go to settings.
    pub fn is_blocked(&self) -> bool {
        self.reason == DenialReason::Blocked
    }
}

/// Failure reported by a host collaborator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    #[error("host facility unavailable: {0}")]
    Unavailable(String),

    #[error("host rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl HostError {
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::Unavailable(_) => "host_unavailable",
            HostError::Rejected { .. } => "host_rejected",
            HostError::Io(_) => "host_io",
            HostError::Serde(_) => "host_serde",
        }
    }
}

/// Errors surfaced by the runner facade and the execution strategies.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CoreError {
    /// Stopped on purpose.
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    /// Duplicate start of a named service.
    #[error("workload '{workload}' is already running")]
    AlreadyRunning { workload: String },

    /// Stop requested on an inactive slot.
    #[error("workload '{workload}' is not running")]
    NotRunning { workload: String },

    #[error("work failed: {0}")]
    WorkFailed(#[from] WorkError),

    #[error("no strategy registered for {0} slots")]
    NoStrategy(SlotKind),

    #[error(transparent)]
    Host(#[from] HostError),

    /// The affinity thread has shut down and cannot take more jobs.
    #[error("affinity thread is gone")]
    AffinityClosed,

    #[error("invalid config: {0}")]
    Config(String),
}

impl CoreError {
    /// `true` for outcomes that are logged but never treated as failures.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            CoreError::Cancelled | CoreError::AlreadyRunning { .. } | CoreError::NotRunning { .. }
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            CoreError::Cancelled => "cancelled",
            CoreError::PermissionDenied(_) => "permission_denied",
            CoreError::AlreadyRunning { .. } => "already_running",
            CoreError::NotRunning { .. } => "not_running",
            CoreError::WorkFailed(_) => "work_failed",
            CoreError::NoStrategy(_) => "no_strategy",
            CoreError::Host(_) => "host_error",
            CoreError::AffinityClosed => "affinity_closed",
            CoreError::Config(_) => "invalid_config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_errors() {
        assert!(CoreError::Cancelled.is_benign());
        assert!(
            CoreError::AlreadyRunning {
                workload: "gps".into()
            }
            .is_benign()
        );
        assert!(
            CoreError::NotRunning {
                workload: "gps".into()
            }
            .is_benign()
        );
        assert!(!CoreError::WorkFailed(WorkError::fail("boom")).is_benign());
        assert!(!CoreError::AffinityClosed.is_benign());
    }

    #[test]
    fn permission_denied_message_names_reason() {
        let err = PermissionDenied {
            capability: Capability::LocationAlways,
            reason: DenialReason::Blocked,
            status: PermissionStatus::Denied,
        };
        assert!(err.is_blocked());
        assert!(err.to_string().contains("blocked"));

        let core: CoreError = err.into();
        assert_eq!(core.as_label(), "permission_denied");
    }

    #[test]
    fn work_error_labels() {
        assert_eq!(WorkError::fail("x").as_label(), "work_failed");
        assert_eq!(WorkError::fatal("x").as_label(), "work_fatal");
        assert_eq!(WorkError::Canceled.as_label(), "work_canceled");
    }
}
