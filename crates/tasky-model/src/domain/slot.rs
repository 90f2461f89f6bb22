use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution mode a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKind {
    /// Ephemeral background task; does not outlive the UI session.
    Task,
    /// OS-scheduled deferred work submitted under a replaceable tag.
    Worker,
    /// Long-lived, OS-visible supervised service.
    Service,
}

impl SlotKind {
    /// Returns a short symbolic identifier for logging and routing.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Task => "task",
            SlotKind::Worker => "worker",
            SlotKind::Service => "service",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named execution context holding at most one active run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub kind: SlotKind,
    pub name: String,
}

impl SlotKey {
    pub fn new(kind: SlotKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn task(name: impl Into<String>) -> Self {
        Self::new(SlotKind::Task, name)
    }

    pub fn worker(tag: impl Into<String>) -> Self {
        Self::new(SlotKind::Worker, tag)
    }

    pub fn service(workload: impl Into<String>) -> Self {
        Self::new(SlotKind::Service, workload)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Lifecycle of a slot.
///
/// ```text
/// Idle → Starting → Running → Stopping → Idle
///                          └→ Failed   → Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl SlotState {
    /// Returns `true` while a run occupies the slot.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SlotState::Starting | SlotState::Running | SlotState::Stopping
        )
    }

    /// Whether `self → next` is an edge of the slot state machine.
    pub fn can_transition(&self, next: SlotState) -> bool {
        use SlotState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Starting, Stopping)
                | (Running, Stopping)
                | (Running, Failed)
                | (Running, Idle)
                | (Stopping, Idle)
                | (Failed, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        assert_eq!(SlotKey::service("gps").to_string(), "service/gps");
        assert_eq!(SlotKey::worker("sync").to_string(), "worker/sync");
    }

    #[test]
    fn live_states() {
        assert!(SlotState::Starting.is_live());
        assert!(SlotState::Running.is_live());
        assert!(SlotState::Stopping.is_live());
        assert!(!SlotState::Idle.is_live());
        assert!(!SlotState::Failed.is_live());
    }

    #[test]
    fn transitions_follow_lifecycle() {
        assert!(SlotState::Idle.can_transition(SlotState::Starting));
        assert!(SlotState::Running.can_transition(SlotState::Stopping));
        assert!(SlotState::Failed.can_transition(SlotState::Idle));

        assert!(!SlotState::Idle.can_transition(SlotState::Running));
        assert!(!SlotState::Stopping.can_transition(SlotState::Running));
        assert!(!SlotState::Failed.can_transition(SlotState::Running));
    }
}
