//! # Host collaborators.
//!
//! The platform services the runtime depends on, as black boxes:
//!
//! | Trait                   | Facility                                                      |
//! |-------------------------|---------------------------------------------------------------|
//! | [`JobScheduler`]        | enqueue deferred job under a tag with a replace policy        |
//! | [`ServiceHost`]         | start/stop a foreground-visible service, query whether running |
//! | [`PowerHost`]           | acquire/release the wake lock                                 |
//! | [`AlarmHost`]           | schedule/cancel a future one-shot restart alarm               |
//! | [`FlagStore`]           | persisted WorkloadFlag                                        |
//! | [`PermissionProvider`]  | check/request a capability, query rationale                   |
//!
//! "Run on a background thread" is `tokio::spawn`; "run on the affinity thread" is
//! [`AffinityThread`](crate::AffinityThread).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tasky_model::{
    Capability, DurationMs, PermissionStatus, Schedule, ServiceAction, ServiceDisposition,
};
use tokio::sync::oneshot;

use crate::{config::ServiceNoticeConfig, error::HostError};

/// What to do with a job already enqueued under the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingJobPolicy {
    /// Drop the old job, enqueue the new one.
    Replace,
    /// Keep the old job, drop the new one.
    Keep,
}

/// Admission ticket for one deferred job.
///
/// The scheduler fires [`JobTicket::start`] when the job may run. Dropping the ticket
/// without starting it means the job was cancelled or superseded.
#[derive(Debug)]
pub struct JobTicket {
    tag: String,
    go: oneshot::Sender<()>,
}

impl JobTicket {
    /// Creates a ticket and the receiver the job waits on.
    pub fn new(tag: impl Into<String>) -> (Self, oneshot::Receiver<()>) {
        let (go, rx) = oneshot::channel();
        (
            Self {
                tag: tag.into(),
                go,
            },
            rx,
        )
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Lets the job run. Returns `false` if the job already gave up waiting.
    pub fn start(self) -> bool {
        self.go.send(()).is_ok()
    }

    /// `true` once the waiting side is gone.
    pub fn is_abandoned(&self) -> bool {
        self.go.is_closed()
    }
}

/// OS-scheduled deferred work.
#[async_trait]
pub trait JobScheduler: Send + Sync + 'static {
    /// Enqueues a unique job under `ticket.tag()`.
    async fn enqueue_unique(
        &self,
        ticket: JobTicket,
        policy: ExistingJobPolicy,
    ) -> Result<(), HostError>;

    /// Drops any pending job under `tag`. Returns whether one was pending.
    async fn cancel(&self, tag: &str) -> Result<bool, HostError>;
}

/// Contents of the visible service notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNotice {
    pub workload: String,
    pub title: String,
    pub text: String,
    pub ticker: String,
    pub actions: Vec<ServiceAction>,
}

impl ServiceNotice {
    pub fn from_config(workload: impl Into<String>, cfg: &ServiceNoticeConfig) -> Self {
        Self {
            workload: workload.into(),
            title: cfg.title.clone(),
            text: cfg.text.clone(),
            ticker: cfg.ticker.clone(),
            actions: vec![ServiceAction::Pause, ServiceAction::Stop],
        }
    }
}

/// Foreground-visible long-running service support.
#[async_trait]
pub trait ServiceHost: Send + Sync + 'static {
    async fn start_foreground(&self, notice: &ServiceNotice) -> Result<(), HostError>;

    async fn stop_foreground(
        &self,
        workload: &str,
        disposition: ServiceDisposition,
    ) -> Result<(), HostError>;

    fn is_running(&self, workload: &str) -> bool;
}

/// Wake-lock facility. Calls are paired by [`WakeLock`](crate::WakeLock).
pub trait PowerHost: Send + Sync + 'static {
    fn acquire_wake_lock(&self, tag: &str) -> Result<(), HostError>;
    fn release_wake_lock(&self, tag: &str);
}

/// "Please restart workload X with interval Y."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartRequest {
    pub workload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<DurationMs>,
}

impl RestartRequest {
    pub fn new(workload: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            workload: workload.into(),
            interval_ms: schedule.interval_ms(),
        }
    }

    pub fn schedule(&self) -> Schedule {
        self.interval_ms.map(Schedule::every_ms).unwrap_or_default()
    }
}

/// One-shot future trigger carrying a [`RestartRequest`]. One alarm per workload.
pub trait AlarmHost: Send + Sync + 'static {
    /// Arms (or re-arms) the alarm for `request.workload` to fire after `after`.
    fn schedule(&self, after: Duration, request: RestartRequest) -> Result<(), HostError>;

    /// Disarms the alarm for `workload`. Returns whether one was armed.
    fn cancel(&self, workload: &str) -> bool;
}

/// Durable WorkloadFlag storage.
pub trait FlagStore: Send + Sync + 'static {
    fn get(&self, workload: &str) -> Result<bool, HostError>;
    fn set(&self, workload: &str, running: bool) -> Result<(), HostError>;
}

/// Platform permission queries.
#[async_trait]
pub trait PermissionProvider: Send + Sync + 'static {
    async fn check_status(&self, capability: Capability) -> PermissionStatus;
    async fn request(&self, capability: Capability) -> PermissionStatus;
    fn should_show_rationale(&self, capability: Capability) -> bool;
}

/// The bundle of collaborators a runner is built from. Cheap to clone.
#[derive(Clone)]
pub struct Host {
    pub jobs: Arc<dyn JobScheduler>,
    pub services: Arc<dyn ServiceHost>,
    pub power: Arc<dyn PowerHost>,
    pub alarms: Arc<dyn AlarmHost>,
    pub flags: Arc<dyn FlagStore>,
    pub permissions: Arc<dyn PermissionProvider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_request_keeps_interval() {
        let req = RestartRequest::new("gps", Schedule::every_ms(5_000));
        assert_eq!(req.schedule(), Schedule::every_ms(5_000));

        let once = RestartRequest::new("gps", Schedule::once());
        assert!(once.schedule().is_once());
    }

    #[tokio::test]
    async fn ticket_start_releases_waiter() {
        let (ticket, rx) = JobTicket::new("sync");
        assert_eq!(ticket.tag(), "sync");
        assert!(ticket.start());
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn dropped_ticket_is_seen_as_cancelled() {
        let (ticket, rx) = JobTicket::new("sync");
        drop(ticket);
        assert!(rx.await.is_err());
    }

    #[test]
    fn notice_has_pause_and_stop() {
        let notice = ServiceNotice::from_config("gps", &ServiceNoticeConfig::default());
        assert_eq!(notice.actions, vec![ServiceAction::Pause, ServiceAction::Stop]);
    }
}
