pub mod affinity;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod executor;
pub mod handle;
pub mod host;
pub mod permission;
pub mod router;
pub mod runner;
pub mod state;
pub mod store;
pub mod strategy;
pub mod wakelock;
pub mod work;

pub use affinity::AffinityThread;
pub use config::{RunnerConfig, ServiceNoticeConfig};
pub use diagnostics::Diagnostics;
pub use error::{CoreError, HostError, PermissionDenied, WorkError};
pub use events::{Bus, RunEvent};
pub use executor::{Outcome, run, sleep_or_cancel};
pub use handle::{RunHandle, RunWatch};
pub use host::{
    AlarmHost, ExistingJobPolicy, FlagStore, Host, JobScheduler, JobTicket, PermissionProvider,
    PowerHost, RestartRequest, ServiceHost, ServiceNotice,
};
pub use permission::PermissionGate;
pub use router::StrategyRouter;
pub use runner::{TaskRunner, TaskRunnerBuilder};
pub use state::{SlotInfo, SlotMap};
pub use store::{FileFlagStore, MemoryFlagStore};
pub use strategy::{LaunchRequest, Strategy, StrategyContext};
pub use wakelock::{WakeLock, WakeLockGuard};
pub use work::{BoxWorkFuture, Work, WorkFn, WorkRef};
