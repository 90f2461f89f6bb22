use std::sync::Arc;

use tasky_core::StrategyRouter;

pub mod background;
pub use background::BackgroundStrategy;

pub mod deferred;
pub use deferred::DeferredStrategy;

pub mod supervised;
pub use supervised::SupervisedStrategy;

pub mod watchdog;
pub use watchdog::{RestartVerdict, Watchdog};

#[cfg(feature = "local")]
pub mod local;
#[cfg(feature = "local")]
pub use local::{LocalAlarms, LocalHost, LocalJobs, LocalPermissions, LocalPower, LocalServices};

/// Router with one strategy per slot kind.
pub fn default_router() -> StrategyRouter {
    StrategyRouter::new()
        .with(Arc::new(BackgroundStrategy))
        .with(Arc::new(DeferredStrategy))
        .with(Arc::new(SupervisedStrategy))
}

pub mod prelude {
    pub use crate::default_router;
    pub use crate::{BackgroundStrategy, DeferredStrategy, SupervisedStrategy, Watchdog};
    #[cfg(feature = "local")]
    pub use crate::LocalHost;
}
