//! # Interval loop executor.
//!
//! Runs one [`Work`] according to a [`Schedule`] and reports a tri-state [`Outcome`].
//!
//! ```text
//! once:      work.spawn() ──► Outcome
//!
//! interval:  loop {
//!              ├─► cancelled? ──► Cancelled
//!              ├─► work.spawn() ── Err ──► Failed (loop ends)
//!              ├─► cancelled? ──► Cancelled
//!              └─► select! { sleep(interval), cancel.cancelled() ──► Cancelled }
//!            }
//! ```
//!
//! ## Rules
//! - Iterations are strictly sequential; iteration n+1 starts no earlier than `interval`
//!   after iteration n returned.
//! - Cancellation is cooperative: it is checked at loop boundaries and aborts the sleep
//!   immediately, but a running invocation is never interrupted.
//! - A failure from the work is never swallowed and is reported distinctly from cancellation.
//!   A work unit that returns [`WorkError::Canceled`] is reported as [`Outcome::Cancelled`].

use std::time::Duration;

use tasky_model::{RunStatus, Schedule};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    error::{CoreError, WorkError},
    work::Work,
};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed(WorkError),
}

impl Outcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Outcome::Completed => RunStatus::Completed,
            Outcome::Cancelled => RunStatus::Cancelled,
            Outcome::Failed(_) => RunStatus::Failed,
        }
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn error(&self) -> Option<&WorkError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Converts into a `Result`, with cancellation mapped to [`CoreError::Cancelled`].
    pub fn into_result(self) -> Result<(), CoreError> {
        match self {
            Outcome::Completed => Ok(()),
            Outcome::Cancelled => Err(CoreError::Cancelled),
            Outcome::Failed(e) => Err(CoreError::WorkFailed(e)),
        }
    }
}

impl From<Result<(), WorkError>> for Outcome {
    fn from(res: Result<(), WorkError>) -> Self {
        match res {
            Ok(()) => Outcome::Completed,
            Err(WorkError::Canceled) => Outcome::Cancelled,
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Runs `work` per `schedule` until it completes, fails, or `cancel` fires.
pub async fn run(work: &dyn Work, cancel: &CancellationToken, schedule: Schedule) -> Outcome {
    let Some(interval) = schedule.interval() else {
        trace!(work = work.name(), "single invocation");
        return Outcome::from(work.spawn(cancel.clone()).await);
    };

    let mut iteration: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        iteration += 1;
        trace!(work = work.name(), iteration, "iteration starting");
        match Outcome::from(work.spawn(cancel.clone()).await) {
            Outcome::Completed => {}
            other => return other,
        }

        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        if !sleep_or_cancel(interval, cancel).await {
            trace!(work = work.name(), iteration, "cancelled during interval sleep");
            return Outcome::Cancelled;
        }
    }
}

/// Sleeps for `dur`, returning `false` as soon as `cancel` fires.
pub async fn sleep_or_cancel(dur: Duration, cancel: &CancellationToken) -> bool {
    select! {
        _ = time::sleep(dur) => true,
        _ = cancel.cancelled() => false,
    }
}
