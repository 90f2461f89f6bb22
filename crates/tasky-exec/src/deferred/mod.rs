//! # Deferred-work strategy.
//!
//! Hands each run to the host [`JobScheduler`](tasky_core::JobScheduler) under the slot's
//! tag with [`ExistingJobPolicy::Replace`], then waits for admission before entering the
//! interval loop:
//!
//! ```text
//! launch ──► enqueue_unique(tag, Replace) ──► Starting
//!              │
//!              └─► driver: select! {
//!                    cancel            ──► Cancelled
//!                    ticket dropped    ──► Cancelled (superseded or cancelled on the host)
//!                    ticket started    ──► Running ──► executor::run(schedule)
//!                  }
//! ```
//!
//! At most one job is in flight per tag; the runner stops the previous run before a
//! replacement is enqueued.

use async_trait::async_trait;
use tasky_core::{
    CoreError, ExistingJobPolicy, JobTicket, LaunchRequest, RunHandle, Strategy, StrategyContext,
    executor::{self, Outcome},
};
use tasky_model::{RunId, RunStatus, SlotKey, SlotKind};
use tokio::select;
use tracing::{debug, trace};

#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredStrategy;

#[async_trait]
impl Strategy for DeferredStrategy {
    fn name(&self) -> &'static str {
        "deferred"
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Worker
    }

    async fn launch(
        &self,
        req: LaunchRequest,
        ctx: &StrategyContext,
    ) -> Result<RunHandle, CoreError> {
        let LaunchRequest {
            slot,
            work,
            schedule,
            cancel,
        } = req;

        let (ticket, admitted) = JobTicket::new(slot.name.clone());
        ctx.host
            .jobs
            .enqueue_unique(ticket, ExistingJobPolicy::Replace)
            .await?;

        let id = RunId::new();
        ctx.report(id, &slot, RunStatus::Starting);
        trace!(slot = %slot, run_id = %id, "deferred job enqueued");

        let token = cancel.clone();
        let report = ctx.clone();
        let key = slot.clone();
        Ok(ctx.drive(id, slot, cancel, async move {
            select! {
                biased;
                _ = token.cancelled() => return Outcome::Cancelled,
                res = admitted => {
                    if res.is_err() {
                        debug!(slot = %key, "deferred job dropped before it started");
                        return Outcome::Cancelled;
                    }
                }
            }
            report.report(id, &key, RunStatus::Running);
            executor::run(work.as_ref(), &token, schedule).await
        }))
    }

    async fn teardown(
        &self,
        slot: &SlotKey,
        ctx: &StrategyContext,
        _forced: bool,
    ) -> Result<(), CoreError> {
        if ctx.host.jobs.cancel(&slot.name).await? {
            debug!(slot = %slot, "pending deferred job cancelled");
        }
        Ok(())
    }
}
