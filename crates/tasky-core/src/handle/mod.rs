//! # Run handles.
//!
//! Every launch produces exactly one [`RunHandle`]: a single-producer single-consumer
//! promise for the run's [`Outcome`], plus its cancellation trigger. The handle owner is
//! the only party that can await the outcome.
//!
//! Code that must observe or stop a run without owning it (the slot map, the event
//! monitor) holds a [`RunWatch`] instead. A watch sees the final outcome and can cancel
//! or abort the run, but cannot consume it.
//!
//! ```text
//! RunHandle::spawn(fut)
//!   ├─► inner task: fut ─────────────► Outcome
//!   └─► outer task: await inner ──┬──► watch channel (RunWatch)
//!                                 └──► JoinHandle<Outcome> (RunHandle::join)
//! ```
//!
//! The outer task classifies how the inner one ended: a panic becomes
//! [`Outcome::Failed`], an abort becomes [`Outcome::Cancelled`].

use std::{future::Future, time::Duration};

use tasky_model::{RunId, SlotKey};
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{error::WorkError, executor::Outcome};

/// Cancellable, awaitable reference to an in-flight execution.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    slot: SlotKey,
    cancel: CancellationToken,
    abort: AbortHandle,
    join: JoinHandle<Outcome>,
    done: watch::Receiver<Option<Outcome>>,
}

impl RunHandle {
    /// Spawns `fut` on the current runtime and returns the handle for it.
    ///
    /// `cancel` is the token `fut` observes; [`RunHandle::cancel`] fires it.
    pub fn spawn<F>(slot: SlotKey, cancel: CancellationToken, fut: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        Self::spawn_with_id(RunId::new(), slot, cancel, fut)
    }

    /// Same as [`RunHandle::spawn`] for a run whose id was allocated up front.
    pub fn spawn_with_id<F>(id: RunId, slot: SlotKey, cancel: CancellationToken, fut: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let inner = tokio::spawn(fut);
        let abort = inner.abort_handle();
        let (tx, done) = watch::channel(None);

        let join = tokio::spawn(async move {
            let outcome = match inner.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => Outcome::Cancelled,
                Err(_) => Outcome::Failed(WorkError::fatal("work panicked")),
            };
            let _ = tx.send(Some(outcome.clone()));
            outcome
        });

        Self {
            id,
            slot,
            cancel,
            abort,
            join,
            done,
        }
    }

    #[inline]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[inline]
    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }

    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Returns an observer for this run.
    pub fn watch(&self) -> RunWatch {
        RunWatch {
            id: self.id,
            slot: self.slot.clone(),
            cancel: self.cancel.clone(),
            abort: self.abort.clone(),
            done: self.done.clone(),
        }
    }

    /// Waits for the run to end.
    pub async fn join(self) -> Outcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Outcome::Cancelled,
            Err(_) => Outcome::Failed(WorkError::fatal("run monitor panicked")),
        }
    }

    /// Cancels the run and waits up to `grace` for it to end.
    ///
    /// Returns `None` when the grace period elapsed and the run was aborted.
    pub async fn stop(mut self, grace: Duration) -> Option<Outcome> {
        self.cancel.cancel();
        match time::timeout(grace, &mut self.join).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(_)) => Some(Outcome::Failed(WorkError::fatal("run monitor panicked"))),
            Err(_) => {
                self.abort.abort();
                None
            }
        }
    }
}

/// Non-owning observer of a run.
#[derive(Debug, Clone)]
pub struct RunWatch {
    id: RunId,
    slot: SlotKey,
    cancel: CancellationToken,
    abort: AbortHandle,
    done: watch::Receiver<Option<Outcome>>,
}

impl RunWatch {
    #[inline]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[inline]
    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Aborts the run at its next suspension point; cleanup guards still drop.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.done.borrow().is_some()
    }

    /// Waits for the run's final outcome.
    pub async fn finished(&mut self) -> Outcome {
        loop {
            if let Some(outcome) = self.done.borrow_and_update().clone() {
                return outcome;
            }
            if self.done.changed().await.is_err() {
                return self
                    .done
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| Outcome::Failed(WorkError::fatal("run monitor vanished")));
            }
        }
    }

    /// Cancels and waits up to `grace`; aborts and returns `None` once it elapses.
    pub async fn stop(&mut self, grace: Duration) -> Option<Outcome> {
        self.cancel.cancel();
        match time::timeout(grace, self.finished()).await {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                self.abort.abort();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::sleep_or_cancel;

    #[tokio::test]
    async fn join_returns_outcome() {
        let h = RunHandle::spawn(SlotKey::task("t"), CancellationToken::new(), async {
            Outcome::Completed
        });
        assert_eq!(h.join().await, Outcome::Completed);
    }

    #[tokio::test]
    async fn panic_becomes_failed() {
        let h = RunHandle::spawn(SlotKey::task("t"), CancellationToken::new(), async {
            if true {
                panic!("boom");
            }
            Outcome::Completed
        });
        let mut w = h.watch();
        assert!(h.join().await.is_failed());
        assert!(w.finished().await.is_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn watch_sees_cancellation() {
        let cancel = CancellationToken::new();
        let c = cancel.clone();
        let h = RunHandle::spawn(SlotKey::worker("w"), cancel, async move {
            if sleep_or_cancel(Duration::from_secs(60), &c).await {
                Outcome::Completed
            } else {
                Outcome::Cancelled
            }
        });

        let mut w = h.watch();
        assert!(!w.is_finished());
        w.cancel();
        assert_eq!(w.finished().await, Outcome::Cancelled);
        assert!(w.is_finished());
        assert_eq!(h.join().await, Outcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_after_grace() {
        let h = RunHandle::spawn(SlotKey::service("stubborn"), CancellationToken::new(), async {
            time::sleep(Duration::from_secs(3600)).await;
            Outcome::Completed
        });
        let mut w = h.watch();

        assert_eq!(h.stop(Duration::from_secs(1)).await, None);
        assert_eq!(w.finished().await, Outcome::Cancelled);
    }
}
