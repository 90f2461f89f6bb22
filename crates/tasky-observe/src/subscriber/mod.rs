use tasky_core::RunEvent;
use tasky_model::RunStatus;
use tokio::{select, sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[inline]
pub fn message_for(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Starting => "run is starting",
        RunStatus::Running => "run is executing",
        RunStatus::Stopping => "stop requested; run is unwinding",
        RunStatus::Completed => "run completed",
        RunStatus::Cancelled => "run cancelled",
        RunStatus::Failed => "run failed",
    }
}

/// Logs one run event at the level its status calls for.
pub fn log_event(ev: &RunEvent) {
    let msg = message_for(ev.status);
    let slot = ev.slot.to_string();

    match ev.status {
        RunStatus::Starting | RunStatus::Stopping => {
            debug!(target: "tasky.events", %slot, run_id = %ev.run_id, seq = ev.seq, "{msg}")
        }
        RunStatus::Running | RunStatus::Completed | RunStatus::Cancelled => {
            info!(target: "tasky.events", %slot, run_id = %ev.run_id, seq = ev.seq, "{msg}")
        }
        RunStatus::Failed => error!(
            target: "tasky.events",
            %slot,
            run_id = %ev.run_id,
            seq = ev.seq,
            reason = ev.error.as_deref().unwrap_or("unknown"),
            "{msg}"
        ),
    }
}

/// Drains a run-event receiver into the log.
pub struct EventLogger {
    rx: broadcast::Receiver<RunEvent>,
}

impl EventLogger {
    pub fn new(rx: broadcast::Receiver<RunEvent>) -> Self {
        Self { rx }
    }

    /// Logs events until the bus closes or `cancel` fires. Returns how many were logged.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let mut logged = 0;
        loop {
            let ev = select! {
                biased;
                _ = cancel.cancelled() => break,
                ev = self.rx.recv() => ev,
            };
            match ev {
                Ok(ev) => {
                    log_event(&ev);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(target: "tasky.events", skipped = n, "event logger lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        logged
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(self.run(cancel))
    }
}
