use async_trait::async_trait;
use tasky_core::{CoreError, LaunchRequest, RunHandle, Strategy, StrategyContext, executor};
use tasky_model::{RunId, RunStatus, SlotKind};
use tracing::trace;

/// Fire-and-forget execution on the tokio pool (`RunTask`).
#[derive(Debug, Default, Clone, Copy)]
pub struct BackgroundStrategy;

#[async_trait]
impl Strategy for BackgroundStrategy {
    fn name(&self) -> &'static str {
        "background"
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Task
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
        let token = cancel.clone();
        let report = ctx.clone();
        let key = slot.clone();

        trace!(slot = %slot, run_id = %id, "background run spawned");
        Ok(ctx.drive(id, slot, cancel, async move {
            report.report(id, &key, RunStatus::Running);
            executor::run(work.as_ref(), &token, schedule).await
        }))
    }
}
