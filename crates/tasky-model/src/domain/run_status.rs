use serde::{Deserialize, Serialize};

/// Status reported for a run as it moves through its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Launch accepted; the strategy is acquiring resources.
    Starting,
    /// The work unit is executing (or sleeping between iterations).
    Running,
    /// Cancellation was requested and the run is unwinding.
    Stopping,
    /// Work finished on its own.
    Completed,
    /// Run stopped on purpose.
    Cancelled,
    /// The work unit returned an error or panicked.
    Failed,
}

impl RunStatus {
    /// Returns `true` if the run won't transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed
        )
    }

    /// Returns `true` while the run still occupies its slot.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Starting => "starting",
            RunStatus::Running => "running",
            RunStatus::Stopping => "stopping",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        }
    }
}
