//! # Supervised-service strategy.
//!
//! Runs a work unit as a foreground-visible service.
//!
//! ## Native foreground hosts (`native_foreground = true`)
//! The host keeps the service alive on its own. The wake lock is a no-op and the whole
//! schedule runs inside one launch.
//!
//! ## Legacy hosts (`native_foreground = false`)
//! Every launch runs a single iteration while holding the wake lock, re-arms the restart
//! alarm for `max(interval, min_restart_delay)` and releases the lock. The
//! [`Watchdog`](crate::Watchdog) turns the alarm back into `start_service`.
//!
//! ## Exit paths
//! - completed / cancelled: foreground stopped with [`ServiceDisposition::NotSticky`];
//! - failed: foreground stopped with [`ServiceDisposition::Sticky`], the run resolves `Failed`;
//! - aborted after the stop grace: the wake lock guard still drops, and
//!   [`Strategy::teardown`] stops the foreground.

use async_trait::async_trait;
use tasky_core::{
    CoreError, LaunchRequest, RestartRequest, RunHandle, ServiceNotice, Strategy,
    StrategyContext, WakeLock,
    executor::{self, Outcome},
};
use tasky_model::{RunId, RunStatus, Schedule, ServiceDisposition, SlotKey, SlotKind};
use tracing::{debug, warn};

const TAG: &str = "SupervisedStrategy";

#[derive(Debug, Default, Clone, Copy)]
pub struct SupervisedStrategy;

impl SupervisedStrategy {
    fn wake_lock(ctx: &StrategyContext, workload: &str) -> WakeLock {
        let tag = format!("tasky:{workload}");
        if ctx.config.native_foreground {
            WakeLock::noop(tag)
        } else {
            WakeLock::new(ctx.host.power.clone(), tag)
        }
    }
}

#[async_trait]
impl Strategy for SupervisedStrategy {
    fn name(&self) -> &'static str {
        "supervised"
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Service
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
        let id = RunId::new();
        let workload = slot.name.clone();
        let lock = Self::wake_lock(ctx, &workload);
        let native = ctx.config.native_foreground;

        ctx.report(id, &slot, RunStatus::Starting);
        let notice = ServiceNotice::from_config(workload.clone(), &ctx.config.notice);
        ctx.host.services.start_foreground(&notice).await?;

        let token = cancel.clone();
        let drv = ctx.clone();
        let key = slot.clone();
        Ok(ctx.drive(id, slot, cancel, async move {
            let guard = lock.scoped();
            drv.report(id, &key, RunStatus::Running);

            let outcome = if native {
                executor::run(work.as_ref(), &token, schedule).await
            } else {
                let outcome = executor::run(work.as_ref(), &token, Schedule::once()).await;
                if outcome == Outcome::Completed && !token.is_cancelled() {
                    rearm(&drv, &workload, schedule);
                }
                outcome
            };
            drop(guard);

            if let Some(e) = outcome.error() {
                drv.diagnostics.log(
                    &format!("service '{workload}' failed"),
                    TAG,
                    Some(e),
                );
            }
            let disposition = match outcome {
                Outcome::Failed(_) => ServiceDisposition::Sticky,
                _ => ServiceDisposition::NotSticky,
            };
            if let Err(e) = drv.host.services.stop_foreground(&workload, disposition).await {
                warn!(workload, label = e.as_label(), "stop foreground failed: {e}");
            }
            outcome
        }))
    }

    async fn teardown(
        &self,
        slot: &SlotKey,
        ctx: &StrategyContext,
        forced: bool,
    ) -> Result<(), CoreError> {
        if !ctx.host.services.is_running(&slot.name) {
            return Ok(());
        }
        debug!(slot = %slot, forced, "stopping foreground service");
        ctx.host
            .services
            .stop_foreground(&slot.name, ServiceDisposition::NotSticky)
            .await?;
        Ok(())
    }
}

fn rearm(ctx: &StrategyContext, workload: &str, schedule: Schedule) {
    let after = ctx.config.restart_delay(schedule.interval());
    match ctx
        .host
        .alarms
        .schedule(after, RestartRequest::new(workload, schedule))
    {
        Ok(()) => debug!(workload, after_ms = after.as_millis() as u64, "restart alarm armed"),
        Err(e) => ctx
            .diagnostics
            .log("could not arm restart alarm", TAG, Some(&e)),
    }
}
