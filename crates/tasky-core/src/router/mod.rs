use std::sync::Arc;

use tasky_model::{SlotKey, SlotKind};
use tracing::{instrument, trace};

use crate::{
    error::CoreError,
    handle::RunHandle,
    strategy::{LaunchRequest, Strategy, StrategyContext},
};

/// Dispatches launches to the strategy registered for the slot kind.
///
/// The first registered strategy for a kind wins.
#[derive(Default, Clone)]
pub struct StrategyRouter {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRouter {
    #[inline]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    #[inline]
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.push(strategy);
    }

    #[inline]
    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn pick(&self, kind: SlotKind) -> Option<&Arc<dyn Strategy>> {
        self.strategies.iter().find(|s| s.kind() == kind)
    }

    fn require(&self, kind: SlotKind) -> Result<&Arc<dyn Strategy>, CoreError> {
        self.pick(kind).ok_or(CoreError::NoStrategy(kind))
    }

    #[instrument(level = "trace", skip(self, req, ctx), fields(slot = %req.slot))]
    pub async fn launch(
        &self,
        req: LaunchRequest,
        ctx: &StrategyContext,
    ) -> Result<RunHandle, CoreError> {
        let s = self.require(req.slot.kind)?;
        let handle = s.launch(req, ctx).await?;
        trace!(strategy = s.name(), run_id = %handle.id(), "strategy launched run");
        Ok(handle)
    }

    pub async fn teardown(
        &self,
        slot: &SlotKey,
        ctx: &StrategyContext,
        forced: bool,
    ) -> Result<(), CoreError> {
        self.require(slot.kind)?.teardown(slot, ctx, forced).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Named(&'static str, SlotKind);

    #[async_trait]
    impl Strategy for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn kind(&self) -> SlotKind {
            self.1
        }

        async fn launch(
            &self,
            _req: LaunchRequest,
            _ctx: &StrategyContext,
        ) -> Result<RunHandle, CoreError> {
            Err(CoreError::Config("not launchable".into()))
        }
    }

    #[test]
    fn pick_by_kind_first_wins() {
        let router = StrategyRouter::new()
            .with(Arc::new(Named("bg", SlotKind::Task)))
            .with(Arc::new(Named("deferred", SlotKind::Worker)))
            .with(Arc::new(Named("deferred-2", SlotKind::Worker)));

        assert_eq!(router.pick(SlotKind::Task).unwrap().name(), "bg");
        assert_eq!(router.pick(SlotKind::Worker).unwrap().name(), "deferred");
        assert!(router.pick(SlotKind::Service).is_none());
    }

    #[test]
    fn missing_kind_is_an_error() {
        let router = StrategyRouter::new();
        assert!(matches!(
            router.require(SlotKind::Service),
            Err(CoreError::NoStrategy(SlotKind::Service))
        ));
    }
}
