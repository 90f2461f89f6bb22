//! # Restart watchdog.
//!
//! Consumes [`RestartRequest`]s fired by the host alarm and re-issues `start_service` for
//! the workload with the interval carried by the request.
//!
//! A request is dropped when:
//! - the WorkloadFlag is clear (the service was stopped on purpose);
//! - no work unit is registered for the workload;
//! - the workload is already live (benign `AlreadyRunning`).

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tasky_core::{CoreError, RestartRequest, TaskRunner, WorkRef};
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What the watchdog did with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartVerdict {
    Restarted,
    FlagClear,
    Unknown,
    AlreadyRunning,
    Failed,
}

#[derive(Clone)]
pub struct Watchdog {
    runner: TaskRunner,
    works: Arc<RwLock<HashMap<String, WorkRef>>>,
}

impl Watchdog {
    pub fn new(runner: TaskRunner) -> Self {
        Self {
            runner,
            works: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the work unit restarted for `workload`. Replaces a previous registration.
    pub fn register(&self, workload: impl Into<String>, work: WorkRef) -> &Self {
        let workload = workload.into();
        let mut works = self.works.write().unwrap_or_else(|e| e.into_inner());
        works.insert(workload.clone(), work);
        debug!(workload, "watchdog work registered");
        self
    }

    pub fn unregister(&self, workload: &str) -> bool {
        let mut works = self.works.write().unwrap_or_else(|e| e.into_inner());
        works.remove(workload).is_some()
    }

    fn lookup(&self, workload: &str) -> Option<WorkRef> {
        let works = self.works.read().unwrap_or_else(|e| e.into_inner());
        works.get(workload).cloned()
    }

    /// Handles one restart request.
    #[instrument(level = "debug", skip_all, fields(workload = %req.workload))]
    pub async fn handle(&self, req: RestartRequest) -> RestartVerdict {
        match self.runner.should_resume(&req.workload) {
            Ok(true) => {}
            Ok(false) => {
                debug!("workload flag clear; restart dropped");
                return RestartVerdict::FlagClear;
            }
            Err(e) => {
                warn!(label = e.as_label(), "workload flag unreadable: {e}");
                return RestartVerdict::Failed;
            }
        }

        let Some(work) = self.lookup(&req.workload) else {
            warn!("no work registered for workload; restart dropped");
            return RestartVerdict::Unknown;
        };

        match self
            .runner
            .start_service(work, &req.workload, req.schedule())
            .await
        {
            Ok(handle) => {
                info!(run_id = %handle.id(), "workload restarted by alarm");
                RestartVerdict::Restarted
            }
            Err(CoreError::AlreadyRunning { .. }) => RestartVerdict::AlreadyRunning,
            Err(e) => {
                self.runner
                    .log(&format!("restart of '{}' failed", req.workload), "Watchdog", Some(&e));
                RestartVerdict::Failed
            }
        }
    }

    /// Drains `rx` until it closes or `cancel` fires.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<RestartRequest>, cancel: CancellationToken) {
        loop {
            select! {
                biased;
                _ = cancel.cancelled() => break,
                req = rx.recv() => match req {
                    Some(req) => {
                        let _ = self.handle(req).await;
                    }
                    None => break,
                },
            }
        }
        debug!("watchdog stopped");
    }

    /// Spawns [`Watchdog::run`] on the current runtime.
    pub fn spawn(
        self,
        rx: mpsc::UnboundedReceiver<RestartRequest>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(rx, cancel).await })
    }
}
