//! # Permission gate.
//!
//! `ensure(capability)` runs the whole check on the affinity thread:
//!
//! ```text
//! check ── granted ──────────────────────────────► Ok
//!   │
//!   ├─ rationale required ──────────────────────► PermissionDenied(blocked)   (no prompt)
//!   │
//!   ├─ [prerequisite, when escalation is on] check ─► request   (outcome only logged)
//!   │
//!   └─ request ─► re-check ── granted ──────────► Ok
//!                        └── otherwise ─────────► PermissionDenied(declined)
//! ```
//!
//! Capabilities form a closed set; [`prerequisite`] is the rule table.

use std::sync::Arc;

use tasky_model::{Capability, DenialReason, PermissionStatus};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    affinity::AffinityThread,
    error::{CoreError, PermissionDenied},
    host::PermissionProvider,
};

struct CapabilityRule {
    capability: Capability,
    /// Weaker capability that must be requested first.
    prerequisite: Option<Capability>,
}

const RULES: [CapabilityRule; 3] = [
    CapabilityRule {
        capability: Capability::LocationWhenInUse,
        prerequisite: None,
    },
    CapabilityRule {
        capability: Capability::LocationAlways,
        prerequisite: Some(Capability::LocationWhenInUse),
    },
    CapabilityRule {
        capability: Capability::Notifications,
        prerequisite: None,
    },
];

/// Capability that must be granted before `capability` can be requested.
pub fn prerequisite(capability: Capability) -> Option<Capability> {
    RULES
        .iter()
        .find(|r| r.capability == capability)
        .and_then(|r| r.prerequisite)
}

#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    affinity: AffinityThread,
    escalate_prerequisites: bool,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>, affinity: AffinityThread) -> Self {
        Self {
            provider,
            affinity,
            escalate_prerequisites: false,
        }
    }

    /// Request the prerequisite capability before its stronger variant.
    pub fn with_prerequisites(mut self, on: bool) -> Self {
        self.escalate_prerequisites = on;
        self
    }

    /// Ensures `capability` is granted, prompting the user if allowed.
    #[instrument(level = "debug", skip_all, fields(%capability))]
    pub async fn ensure(&self, capability: Capability) -> Result<(), CoreError> {
        let provider = Arc::clone(&self.provider);
        let escalate = self.escalate_prerequisites;
        self.affinity
            .run(move || async move { check(provider.as_ref(), capability, escalate).await })
            .await?
            .map_err(CoreError::from)
    }

    /// Like [`PermissionGate::ensure`], but returns [`CoreError::Cancelled`] as soon as
    /// `cancel` fires, even while a prompt is open. The abandoned check is dropped on the
    /// affinity thread too.
    pub async fn ensure_cancellable(
        &self,
        capability: Capability,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        select! {
            biased;
            _ = cancel.cancelled() => Err(CoreError::Cancelled),
            res = self.ensure(capability) => res,
        }
    }
}

async fn check(
    provider: &dyn PermissionProvider,
    capability: Capability,
    escalate: bool,
) -> Result<(), PermissionDenied> {
    let status = provider.check_status(capability).await;
    if status.is_granted() {
        return Ok(());
    }

    if provider.should_show_rationale(capability) {
        debug!(%capability, ?status, "rationale required; not prompting");
        return Err(denied(capability, DenialReason::Blocked, status));
    }

    if escalate && let Some(pre) = prerequisite(capability) {
        let pre_status = request_and_recheck(provider, pre).await;
        if !pre_status.is_granted() {
            debug!(
                %capability,
                prerequisite = %pre,
                ?pre_status,
                "prerequisite not granted; requesting anyway"
            );
        }
    }

    let status = request_and_recheck(provider, capability).await;
    if status.is_granted() {
        Ok(())
    } else {
        Err(denied(capability, DenialReason::Declined, status))
    }
}

async fn request_and_recheck(
    provider: &dyn PermissionProvider,
    capability: Capability,
) -> PermissionStatus {
    let current = provider.check_status(capability).await;
    if current.is_granted() {
        return current;
    }
    let requested = provider.request(capability).await;
    debug!(%capability, ?requested, "permission requested");
    if requested.is_granted() {
        return requested;
    }
    provider.check_status(capability).await
}

fn denied(capability: Capability, reason: DenialReason, status: PermissionStatus) -> PermissionDenied {
    PermissionDenied {
        capability,
        reason,
        status,
    }
}
