//! # Execution strategies.
//!
//! A [`Strategy`] turns a [`LaunchRequest`] into a running [`RunHandle`] for one slot
//! kind. The runner facade picks the strategy through the
//! [`StrategyRouter`](crate::StrategyRouter) and keeps the slot bookkeeping;
//! strategies own everything host-specific (job admission, foreground notice, wake
//! lock, restart alarm).

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use tasky_model::{RunId, RunStatus, Schedule, SlotKey, SlotKind};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RunnerConfig,
    diagnostics::Diagnostics,
    error::CoreError,
    events::{Bus, RunEvent},
    executor::Outcome,
    handle::RunHandle,
    host::Host,
    work::WorkRef,
};

/// Everything a strategy needs to start one run.
pub struct LaunchRequest {
    pub slot: SlotKey,
    pub work: WorkRef,
    pub schedule: Schedule,
    /// Token the run observes. The handle's `cancel` fires this token.
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for LaunchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchRequest")
            .field("slot", &self.slot)
            .field("work", &self.work.name())
            .field("schedule", &self.schedule)
            .finish()
    }
}

/// Shared services handed to strategies. Cheap to clone.
#[derive(Clone)]
pub struct StrategyContext {
    pub host: Host,
    pub bus: Bus,
    pub diagnostics: Diagnostics,
    pub config: Arc<RunnerConfig>,
}

impl StrategyContext {
    pub fn report(&self, id: RunId, slot: &SlotKey, status: RunStatus) {
        self.bus.publish(RunEvent::new(id, slot.clone(), status));
    }

    /// Spawns `fut` as run `id` and publishes its terminal event when it ends.
    pub fn drive<F>(&self, id: RunId, slot: SlotKey, cancel: CancellationToken, fut: F) -> RunHandle
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let handle = RunHandle::spawn_with_id(id, slot, cancel, fut);

        let mut watch = handle.watch();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let outcome = watch.finished().await;
            bus.publish(RunEvent::finished(watch.id(), watch.slot().clone(), &outcome));
        });
        handle
    }
}

/// One platform execution model.
#[async_trait]
pub trait Strategy: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Slot kind this strategy serves.
    fn kind(&self) -> SlotKind;

    async fn launch(
        &self,
        req: LaunchRequest,
        ctx: &StrategyContext,
    ) -> Result<RunHandle, CoreError>;

    /// Host-side cleanup after the run in `slot` was stopped.
    ///
    /// `forced` is `true` when the run had to be aborted after the grace period.
    async fn teardown(
        &self,
        _slot: &SlotKey,
        _ctx: &StrategyContext,
        _forced: bool,
    ) -> Result<(), CoreError> {
        Ok(())
    }
}
