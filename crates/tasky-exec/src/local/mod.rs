//! # Local reference host.
//!
//! tokio-backed implementations of the host collaborators, for tests, demos and hosts
//! that run everything in-process.
//!
//! | Collaborator        | Behavior                                                          |
//! |---------------------|-------------------------------------------------------------------|
//! | [`LocalJobs`]       | admits jobs at once unless held; `Replace` drops the pending job  |
//! | [`LocalServices`]   | tracks running notices and the last stop disposition              |
//! | [`LocalPower`]      | counts held wake locks                                            |
//! | [`LocalAlarms`]     | one `tokio::time::sleep` per workload, delivered on an mpsc       |
//! | [`LocalPermissions`]| static status table with optional grant-on-request                |

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tasky_core::{
    AlarmHost, ExistingJobPolicy, FlagStore, Host, HostError, JobScheduler, JobTicket,
    PermissionProvider, PowerHost, RestartRequest, ServiceHost, ServiceNotice,
};
use tasky_model::{Capability, PermissionStatus, ServiceDisposition};
use tokio::{runtime::Handle, sync::mpsc, task::AbortHandle};
use tracing::{debug, info, trace};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-process job scheduler.
#[derive(Debug, Default)]
pub struct LocalJobs {
    state: Mutex<JobsState>,
}

#[derive(Debug, Default)]
struct JobsState {
    held: bool,
    pending: HashMap<String, JobTicket>,
}

impl LocalJobs {
    /// While held, enqueued jobs wait instead of starting.
    pub fn hold(&self, held: bool) {
        let ready: Vec<JobTicket> = {
            let mut st = locked(&self.state);
            st.held = held;
            if held {
                return;
            }
            st.pending.drain().map(|(_, t)| t).collect()
        };
        for ticket in ready {
            let tag = ticket.tag().to_string();
            if !ticket.start() {
                trace!(tag, "released job was already abandoned");
            }
        }
    }

    pub fn pending(&self) -> usize {
        locked(&self.state).pending.len()
    }
}

#[async_trait]
impl JobScheduler for LocalJobs {
    async fn enqueue_unique(
        &self,
        ticket: JobTicket,
        policy: ExistingJobPolicy,
    ) -> Result<(), HostError> {
        let mut st = locked(&self.state);
        let tag = ticket.tag().to_string();

        if st.pending.contains_key(&tag) && policy == ExistingJobPolicy::Keep {
            debug!(tag, "job already pending; keeping it");
            return Ok(());
        }
        if st.held {
            if st.pending.insert(tag.clone(), ticket).is_some() {
                debug!(tag, "pending job replaced");
            }
            return Ok(());
        }
        drop(st);

        if !ticket.start() {
            trace!(tag, "job abandoned before admission");
        }
        Ok(())
    }

    async fn cancel(&self, tag: &str) -> Result<bool, HostError> {
        Ok(locked(&self.state).pending.remove(tag).is_some())
    }
}

/// In-process foreground service registry.
#[derive(Debug, Default)]
pub struct LocalServices {
    running: Mutex<HashMap<String, ServiceNotice>>,
    stopped: Mutex<HashMap<String, ServiceDisposition>>,
}

impl LocalServices {
    pub fn notice(&self, workload: &str) -> Option<ServiceNotice> {
        locked(&self.running).get(workload).cloned()
    }

    /// Disposition the workload was last stopped with.
    pub fn last_disposition(&self, workload: &str) -> Option<ServiceDisposition> {
        locked(&self.stopped).get(workload).copied()
    }
}

#[async_trait]
impl ServiceHost for LocalServices {
    async fn start_foreground(&self, notice: &ServiceNotice) -> Result<(), HostError> {
        let mut running = locked(&self.running);
        if running.contains_key(&notice.workload) {
            return Err(HostError::Rejected {
                op: "start_foreground",
                reason: format!("service '{}' is already in the foreground", notice.workload),
            });
        }
        info!(workload = %notice.workload, title = %notice.title, "foreground service started");
        running.insert(notice.workload.clone(), notice.clone());
        Ok(())
    }

    async fn stop_foreground(
        &self,
        workload: &str,
        disposition: ServiceDisposition,
    ) -> Result<(), HostError> {
        if locked(&self.running).remove(workload).is_some() {
            info!(workload, ?disposition, "foreground service stopped");
        }
        locked(&self.stopped).insert(workload.to_string(), disposition);
        Ok(())
    }

    fn is_running(&self, workload: &str) -> bool {
        locked(&self.running).contains_key(workload)
    }
}

/// Wake-lock accounting.
#[derive(Debug, Default)]
pub struct LocalPower {
    held: Mutex<HashMap<String, usize>>,
    acquired_total: Mutex<usize>,
}

impl LocalPower {
    /// Locks currently held across all tags.
    pub fn held_count(&self) -> usize {
        locked(&self.held).values().sum()
    }

    /// Acquisitions since creation.
    pub fn acquired_total(&self) -> usize {
        *locked(&self.acquired_total)
    }
}

impl PowerHost for LocalPower {
    fn acquire_wake_lock(&self, tag: &str) -> Result<(), HostError> {
        *locked(&self.held).entry(tag.to_string()).or_default() += 1;
        *locked(&self.acquired_total) += 1;
        Ok(())
    }

    fn release_wake_lock(&self, tag: &str) {
        let mut held = locked(&self.held);
        if let Some(n) = held.get_mut(tag) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                held.remove(tag);
            }
        }
    }
}

/// One-shot restart alarms delivered on an unbounded channel.
#[derive(Debug)]
pub struct LocalAlarms {
    tx: mpsc::UnboundedSender<RestartRequest>,
    armed: Arc<Mutex<HashMap<String, Armed>>>,
    generation: AtomicU64,
}

#[derive(Debug)]
struct Armed {
    generation: u64,
    task: AbortHandle,
}

/// Forgets the alarm for `workload` unless it has been re-armed since `generation` fired.
fn disarm_fired(armed: &Mutex<HashMap<String, Armed>>, workload: &str, generation: u64) {
    let mut armed = locked(armed);
    if armed.get(workload).is_some_and(|a| a.generation == generation) {
        armed.remove(workload);
    }
}

impl LocalAlarms {
    /// Returns the alarm host and the receiver a [`Watchdog`](crate::Watchdog) drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RestartRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                armed: Arc::new(Mutex::new(HashMap::new())),
                generation: AtomicU64::new(0),
            },
            rx,
        )
    }

    pub fn is_armed(&self, workload: &str) -> bool {
        locked(&self.armed).contains_key(workload)
    }
}

impl AlarmHost for LocalAlarms {
    fn schedule(&self, after: Duration, request: RestartRequest) -> Result<(), HostError> {
        let rt = Handle::try_current().map_err(|e| HostError::Unavailable(e.to_string()))?;
        let workload = request.workload.clone();
        let tx = self.tx.clone();
        let armed = Arc::clone(&self.armed);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut slots = locked(&self.armed);
        let key = workload.clone();
        let task = rt.spawn(async move {
            tokio::time::sleep(after).await;
            disarm_fired(&armed, &key, generation);
            debug!(workload = %key, "restart alarm fired");
            let _ = tx.send(request);
        });
        let entry = Armed {
            generation,
            task: task.abort_handle(),
        };
        if let Some(prev) = slots.insert(workload, entry) {
            prev.task.abort();
        }
        Ok(())
    }

    fn cancel(&self, workload: &str) -> bool {
        match locked(&self.armed).remove(workload) {
            Some(armed) => {
                armed.task.abort();
                true
            }
            None => false,
        }
    }
}

/// Static permission table.
#[derive(Debug, Default)]
pub struct LocalPermissions {
    status: Mutex<HashMap<Capability, PermissionStatus>>,
    grant_on_request: HashSet<Capability>,
    rationale: HashSet<Capability>,
    requests: Mutex<Vec<Capability>>,
}

impl LocalPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, capability: Capability, status: PermissionStatus) -> Self {
        locked(&self.status).insert(capability, status);
        self
    }

    /// The user accepts the prompt for `capability`.
    pub fn granting(mut self, capability: Capability) -> Self {
        self.grant_on_request.insert(capability);
        self
    }

    /// The platform asks for a rationale instead of a prompt for `capability`.
    pub fn blocking(mut self, capability: Capability) -> Self {
        self.rationale.insert(capability);
        self
    }

    /// Capabilities prompted for, in order.
    pub fn requests(&self) -> Vec<Capability> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl PermissionProvider for LocalPermissions {
    async fn check_status(&self, capability: Capability) -> PermissionStatus {
        locked(&self.status)
            .get(&capability)
            .copied()
            .unwrap_or(PermissionStatus::Denied)
    }

    async fn request(&self, capability: Capability) -> PermissionStatus {
        locked(&self.requests).push(capability);
        let status = if self.grant_on_request.contains(&capability) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        locked(&self.status).insert(capability, status);
        status
    }

    fn should_show_rationale(&self, capability: Capability) -> bool {
        self.rationale.contains(&capability)
    }
}

/// The whole local host, with typed access to each collaborator.
#[derive(Debug, Clone)]
pub struct LocalHost {
    pub jobs: Arc<LocalJobs>,
    pub services: Arc<LocalServices>,
    pub power: Arc<LocalPower>,
    pub alarms: Arc<LocalAlarms>,
    pub permissions: Arc<LocalPermissions>,
}

impl LocalHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RestartRequest>) {
        Self::with_permissions(LocalPermissions::new())
    }

    pub fn with_permissions(
        permissions: LocalPermissions,
    ) -> (Self, mpsc::UnboundedReceiver<RestartRequest>) {
        let (alarms, rx) = LocalAlarms::new();
        (
            Self {
                jobs: Arc::default(),
                services: Arc::default(),
                power: Arc::default(),
                alarms: Arc::new(alarms),
                permissions: Arc::new(permissions),
            },
            rx,
        )
    }

    /// Bundles the collaborators with `flags` into a [`Host`].
    pub fn host(&self, flags: Arc<dyn FlagStore>) -> Host {
        Host {
            jobs: self.jobs.clone(),
            services: self.services.clone(),
            power: self.power.clone(),
            alarms: self.alarms.clone(),
            flags,
            permissions: self.permissions.clone(),
        }
    }
}
