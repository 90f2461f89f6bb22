use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capabilities the runtime knows how to gate on.
///
/// The set is closed: each variant maps to one row of the permission gate's rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Location while the app is in the foreground.
    LocationWhenInUse,
    /// Location at any time, including from background execution.
    LocationAlways,
    /// Posting the service notification.
    Notifications,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::LocationWhenInUse,
        Capability::LocationAlways,
        Capability::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::LocationWhenInUse => "location_when_in_use",
            Capability::LocationAlways => "location_always",
            Capability::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown capability: {0}")]
pub struct ParseCapabilityError(String);

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == norm)
            .ok_or_else(|| ParseCapabilityError(s.to_string()))
    }
}

/// Status reported by the platform permission provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    #[default]
    Unknown,
    Denied,
    Disabled,
    Granted,
    Restricted,
    Limited,
}

impl PermissionStatus {
    #[inline]
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Why a capability was not granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DenialReason {
    /// The platform asks for a rationale instead of another prompt ("do not ask again").
    Blocked,
    /// The user was prompted and said no.
    Declined,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::Blocked => "blocked",
            DenialReason::Declined => "declined",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
