//! # Run status events.
//!
//! Strategies and the runner publish a [`RunEvent`] whenever a run changes status.
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]:
//!
//! - `publish()` never blocks; without receivers the event is dropped.
//! - Capacity is shared by all receivers; slow receivers observe `RecvError::Lagged(n)`.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

use serde::Serialize;
use tasky_model::{RunId, RunStatus, SlotKey};
use tokio::sync::broadcast;

use crate::executor::Outcome;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Status change of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    /// Process-wide monotonic sequence number.
    pub seq: u64,
    pub run_id: RunId,
    pub slot: SlotKey,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: SystemTime,
}

impl RunEvent {
    pub fn new(run_id: RunId, slot: SlotKey, status: RunStatus) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            run_id,
            slot,
            status,
            error: None,
            at: SystemTime::now(),
        }
    }

    /// Terminal event for `outcome`.
    pub fn finished(run_id: RunId, slot: SlotKey, outcome: &Outcome) -> Self {
        let mut ev = Self::new(run_id, slot, outcome.status());
        ev.error = outcome.error().map(|e| e.to_string());
        ev
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Broadcast channel for [`RunEvent`]s. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<RunEvent>,
}

impl Bus {
    /// Creates a bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: RunEvent) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(256)
    }
}
