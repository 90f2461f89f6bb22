use serde::{Deserialize, Serialize};

/// Action attached to the visible service notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceAction {
    Pause,
    Stop,
}

impl ServiceAction {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceAction::Pause => "Pause",
            ServiceAction::Stop => "Stop",
        }
    }
}

/// What the host should do with a service after its run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceDisposition {
    /// The host may relaunch the service later.
    Sticky,
    /// Stopped on purpose; do not relaunch.
    NotSticky,
}
