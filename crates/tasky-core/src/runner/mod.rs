//! # Task runner facade.
//!
//! [`TaskRunner`] is the public contract: `run_task`, `run_worker`, `start_service`,
//! `stop_service`, `ensure_granted` and `log`. It gates on the permission gate, keeps one
//! slot per task/worker/service, and dispatches launches to the strategy registered
//! for the slot kind.
//!
//! ## Slot policies
//! - **worker**: a new run replaces the live one; the old run is cancelled and awaited
//!   (bounded by `stop_grace`) before the new one is registered.
//! - **service**: a start while the workload is live is rejected with
//!   [`CoreError::AlreadyRunning`], which is benign.
//! - **task**: not tracked; the caller owns the returned handle.
//!
//! Lifecycle operations on the same slot are serialized; different slots are independent.

use std::{error::Error as StdError, sync::Arc};

use tasky_model::{Capability, RunStatus, Schedule, ServiceAction, SlotKey, SlotState};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::{
    affinity::AffinityThread,
    config::RunnerConfig,
    diagnostics::Diagnostics,
    error::CoreError,
    events::{Bus, RunEvent},
    executor::Outcome,
    handle::{RunHandle, RunWatch},
    host::Host,
    permission::PermissionGate,
    router::StrategyRouter,
    state::{SlotInfo, SlotMap},
    strategy::{LaunchRequest, Strategy, StrategyContext},
    work::WorkRef,
};

const TAG: &str = "TaskRunner";

/// Builder for [`TaskRunner`].
pub struct TaskRunnerBuilder {
    host: Host,
    config: RunnerConfig,
    router: StrategyRouter,
    diagnostics: Diagnostics,
    affinity: Option<AffinityThread>,
}

impl TaskRunnerBuilder {
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.router.register(strategy);
        self
    }

    pub fn with_router(mut self, router: StrategyRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Uses an existing affinity thread instead of spawning one.
    pub fn with_affinity(mut self, affinity: AffinityThread) -> Self {
        self.affinity = Some(affinity);
        self
    }

    pub fn build(self) -> Result<TaskRunner, CoreError> {
        self.config.validate()?;
        let affinity = match self.affinity {
            Some(a) => a,
            None => AffinityThread::spawn("tasky-affinity")?,
        };
        let gate = PermissionGate::new(Arc::clone(&self.host.permissions), affinity)
            .with_prerequisites(self.config.escalate_prerequisites);

        let ctx = StrategyContext {
            host: self.host,
            bus: Bus::new(self.config.bus_capacity),
            diagnostics: self.diagnostics,
            config: Arc::new(self.config),
        };
        debug!(
            native_foreground = ctx.config.native_foreground,
            "task runner is ready"
        );
        Ok(TaskRunner {
            inner: Arc::new(Inner {
                router: self.router,
                ctx,
                slots: SlotMap::new(),
                gate,
            }),
        })
    }
}

/// The public task runner contract. Cheap to clone.
#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<Inner>,
}

struct Inner {
    router: StrategyRouter,
    ctx: StrategyContext,
    slots: SlotMap,
    gate: PermissionGate,
}

impl TaskRunner {
    pub fn builder(host: Host) -> TaskRunnerBuilder {
        TaskRunnerBuilder {
            host,
            config: RunnerConfig::default(),
            router: StrategyRouter::new(),
            diagnostics: Diagnostics::local(),
            affinity: None,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.inner.ctx.config
    }

    pub fn context(&self) -> &StrategyContext {
        &self.inner.ctx
    }

    /// Receiver for run status events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.inner.ctx.bus.subscribe()
    }

    /// The single diagnostics entry point.
    #[track_caller]
    pub fn log(&self, message: &str, tag: &str, error: Option<&dyn StdError>) {
        self.inner.ctx.diagnostics.log(message, tag, error);
    }

    /// Fire-and-forget background execution. The caller owns the returned handle.
    #[instrument(level = "debug", skip_all, fields(work = %work.name()))]
    pub async fn run_task(
        &self,
        work: WorkRef,
        cancel: CancellationToken,
        schedule: Schedule,
    ) -> Result<RunHandle, CoreError> {
        let req = LaunchRequest {
            slot: SlotKey::task(work.name()),
            work,
            schedule,
            cancel,
        };
        self.inner.router.launch(req, &self.inner.ctx).await
    }

    /// Enqueues deferred work under the configured default tag.
    pub async fn run_worker(
        &self,
        work: WorkRef,
        cancel: CancellationToken,
        schedule: Schedule,
    ) -> Result<RunHandle, CoreError> {
        let tag = self.inner.ctx.config.worker_tag.clone();
        self.run_worker_tagged(&tag, work, cancel, schedule).await
    }

    /// Enqueues deferred work under `tag`, replacing the live worker with that tag.
    #[instrument(level = "debug", skip(self, work, cancel, schedule))]
    pub async fn run_worker_tagged(
        &self,
        tag: &str,
        work: WorkRef,
        cancel: CancellationToken,
        schedule: Schedule,
    ) -> Result<RunHandle, CoreError> {
        let key = SlotKey::worker(tag);
        let lock = self.inner.slots.lock(&key);
        let _guard = lock.lock().await;

        if let Some(old) = self.inner.slots.take(&key) {
            self.log(
                &format!("replacing worker '{tag}' (run {})", old.id()),
                TAG,
                None,
            );
            self.halt(&key, old).await;
        }
        self.launch_into(key, work, schedule, cancel).await
    }

    /// Cancels the live worker under `tag` and drops any pending host job.
    ///
    /// Returns whether a worker was live.
    #[instrument(level = "debug", skip(self))]
    pub async fn cancel_worker(&self, tag: &str) -> bool {
        let key = SlotKey::worker(tag);
        let lock = self.inner.slots.lock(&key);
        let _guard = lock.lock().await;

        let Some(run) = self.inner.slots.take(&key) else {
            self.teardown(&key, false).await;
            return false;
        };
        let outcome = self.halt(&key, run).await;
        self.teardown(&key, outcome.is_none()).await;
        true
    }

    /// Starts `work` as the supervised service `workload`.
    ///
    /// Persists the WorkloadFlag before launching. A second start while the workload is
    /// live fails with [`CoreError::AlreadyRunning`] and leaves the live run untouched.
    #[instrument(level = "debug", skip(self, work, schedule))]
    pub async fn start_service(
        &self,
        work: WorkRef,
        workload: &str,
        schedule: Schedule,
    ) -> Result<RunHandle, CoreError> {
        let key = SlotKey::service(workload);
        let lock = self.inner.slots.lock(&key);
        let _guard = lock.lock().await;

        if self.inner.slots.state(&key).is_live() || self.inner.ctx.host.services.is_running(workload) {
            self.log(&format!("service '{workload}' is already running"), TAG, None);
            return Err(CoreError::AlreadyRunning {
                workload: workload.to_string(),
            });
        }

        self.inner.ctx.host.flags.set(workload, true)?;
        let res = self
            .launch_into(key, work, schedule, CancellationToken::new())
            .await;
        if let Err(e) = &res {
            self.log(&format!("service '{workload}' failed to start"), TAG, Some(e));
            if let Err(e) = self.inner.ctx.host.flags.set(workload, false) {
                self.log("could not clear workload flag", TAG, Some(&e));
            }
        }
        res
    }

    /// Stops the service `workload` and clears its WorkloadFlag.
    ///
    /// Returns `true` when the service stopped cleanly or was not running, `false` when
    /// its run failed or had to be aborted after `stop_grace`.
    #[instrument(level = "debug", skip(self))]
    pub async fn stop_service(&self, workload: &str) -> bool {
        let key = SlotKey::service(workload);
        let lock = self.inner.slots.lock(&key);
        let _guard = lock.lock().await;

        if let Err(e) = self.inner.ctx.host.flags.set(workload, false) {
            self.log("could not clear workload flag", TAG, Some(&e));
        }
        if self.inner.ctx.host.alarms.cancel(workload) {
            debug!(workload, "restart alarm disarmed");
        }

        let Some(run) = self.inner.slots.take(&key) else {
            if self.inner.ctx.host.services.is_running(workload) {
                self.log(&format!("tearing down orphaned service '{workload}'"), TAG, None);
                self.teardown(&key, false).await;
            } else {
                let not_running = CoreError::NotRunning {
                    workload: workload.to_string(),
                };
                debug!(label = not_running.as_label(), "{not_running}");
            }
            return true;
        };

        let outcome = self.halt(&key, run).await;
        // A legacy iteration finishing during the halt re-arms the alarm.
        if self.inner.ctx.host.alarms.cancel(workload) {
            debug!(workload, "restart alarm re-armed during stop; disarmed");
        }
        self.teardown(&key, outcome.is_none()).await;
        match outcome {
            Some(Outcome::Failed(e)) => {
                self.log(&format!("service '{workload}' ended with failure"), TAG, Some(&e));
                false
            }
            Some(_) => {
                self.log(&format!("service '{workload}' stopped"), TAG, None);
                true
            }
            None => {
                self.log(
                    &format!("service '{workload}' ignored cancellation and was aborted"),
                    TAG,
                    None,
                );
                false
            }
        }
    }

    /// Reacts to an action on the service notice: `Pause` is logged, `Stop` stops.
    pub async fn handle_service_action(&self, workload: &str, action: ServiceAction) -> bool {
        match action {
            ServiceAction::Pause => {
                self.log(&format!("pause requested for '{workload}'"), TAG, None);
                true
            }
            ServiceAction::Stop => self.stop_service(workload).await,
        }
    }

    /// Whether the WorkloadFlag says `workload` should be running.
    pub fn should_resume(&self, workload: &str) -> Result<bool, CoreError> {
        Ok(self.inner.ctx.host.flags.get(workload)?)
    }

    /// Starts `workload` again after a relaunch if its WorkloadFlag is set.
    ///
    /// Returns `Ok(None)` when the flag is clear or the service is already live.
    pub async fn resume_service(
        &self,
        work: WorkRef,
        workload: &str,
        schedule: Schedule,
    ) -> Result<Option<RunHandle>, CoreError> {
        if !self.should_resume(workload)? {
            debug!(workload, "workload flag clear; not resuming");
            return Ok(None);
        }
        match self.start_service(work, workload, schedule).await {
            Ok(handle) => Ok(Some(handle)),
            Err(CoreError::AlreadyRunning { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Ensures `capability` is granted; see [`PermissionGate::ensure`].
    pub async fn ensure_granted(&self, capability: Capability) -> Result<(), CoreError> {
        let res = self.inner.gate.ensure(capability).await;
        if let Err(e) = &res {
            self.log(&format!("permission {capability} not granted"), TAG, Some(e));
        }
        res
    }

    /// Like [`TaskRunner::ensure_granted`], abandoning the wait when `cancel` fires.
    pub async fn ensure_granted_cancellable(
        &self,
        capability: Capability,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        self.inner.gate.ensure_cancellable(capability, cancel).await
    }

    pub fn slot_state(&self, key: &SlotKey) -> SlotState {
        self.inner.slots.state(key)
    }

    pub fn slot_info(&self, key: &SlotKey) -> Option<SlotInfo> {
        self.inner.slots.info(key)
    }

    pub fn live_slots(&self) -> Vec<SlotKey> {
        self.inner.slots.live()
    }

    /// Stops every live worker and service without touching WorkloadFlags.
    pub async fn shutdown(&self) {
        for key in self.inner.slots.live() {
            let lock = self.inner.slots.lock(&key);
            let _guard = lock.lock().await;
            if let Some(run) = self.inner.slots.take(&key) {
                let outcome = self.halt(&key, run).await;
                self.teardown(&key, outcome.is_none()).await;
            }
        }
        debug!("task runner shut down");
    }

    async fn launch_into(
        &self,
        key: SlotKey,
        work: WorkRef,
        schedule: Schedule,
        cancel: CancellationToken,
    ) -> Result<RunHandle, CoreError> {
        if self.inner.slots.begin(&key).is_err() {
            return Err(CoreError::AlreadyRunning {
                workload: key.name.clone(),
            });
        }

        let req = LaunchRequest {
            slot: key.clone(),
            work,
            schedule,
            cancel,
        };
        match self.inner.router.launch(req, &self.inner.ctx).await {
            Ok(handle) => {
                let watch = handle.watch();
                self.inner.slots.attach(&key, watch.clone());
                self.reap(key, watch);
                Ok(handle)
            }
            Err(e) => {
                self.inner.slots.fail(&key);
                Err(e)
            }
        }
    }

    /// Settles the slot when the run ends on its own.
    fn reap(&self, key: SlotKey, mut watch: RunWatch) {
        let slots = self.inner.slots.clone();
        tokio::spawn(async move {
            let outcome = watch.finished().await;
            if slots.finish(&key, watch.id(), outcome.status()) {
                debug!(slot = %key, status = outcome.status().as_str(), "slot released");
            }
        });
    }

    /// Cancels a detached run and waits for it within `stop_grace`.
    async fn halt(&self, key: &SlotKey, mut run: RunWatch) -> Option<Outcome> {
        self.inner.ctx.report(run.id(), key, RunStatus::Stopping);
        let outcome = run.stop(self.inner.ctx.config.stop_grace()).await;
        if outcome.is_none() {
            warn!(slot = %key, run_id = %run.id(), "run ignored cancellation; aborted after grace");
        }
        self.inner.slots.release(key);
        outcome
    }

    async fn teardown(&self, key: &SlotKey, forced: bool) {
        if self.inner.router.pick(key.kind).is_none() {
            return;
        }
        if let Err(e) = self.inner.router.teardown(key, &self.inner.ctx, forced).await {
            self.log(&format!("teardown of {key} failed"), TAG, Some(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use tasky_model::{PermissionStatus, RunId, ServiceDisposition, SlotKind};

    use super::*;
    use crate::{
        error::{HostError, WorkError},
        executor,
        host::{
            AlarmHost, ExistingJobPolicy, FlagStore, JobScheduler, JobTicket, PermissionProvider,
            PowerHost, RestartRequest, ServiceHost, ServiceNotice,
        },
        store::MemoryFlagStore,
        work::WorkFn,
    };

    struct Null;

    #[async_trait]
    impl JobScheduler for Null {
        async fn enqueue_unique(
            &self,
            ticket: JobTicket,
            _policy: ExistingJobPolicy,
        ) -> Result<(), HostError> {
            ticket.start();
            Ok(())
        }

        async fn cancel(&self, _tag: &str) -> Result<bool, HostError> {
            Ok(false)
        }
    }

    #[async_trait]
    impl ServiceHost for Null {
        async fn start_foreground(&self, _notice: &ServiceNotice) -> Result<(), HostError> {
            Ok(())
        }

        async fn stop_foreground(
            &self,
            _workload: &str,
            _disposition: ServiceDisposition,
        ) -> Result<(), HostError> {
            Ok(())
        }

        fn is_running(&self, _workload: &str) -> bool {
            false
        }
    }

    impl PowerHost for Null {
        fn acquire_wake_lock(&self, _tag: &str) -> Result<(), HostError> {
            Ok(())
        }

        fn release_wake_lock(&self, _tag: &str) {}
    }

    impl AlarmHost for Null {
        fn schedule(&self, _after: Duration, _request: RestartRequest) -> Result<(), HostError> {
            Ok(())
        }

        fn cancel(&self, _workload: &str) -> bool {
            false
        }
    }

    #[async_trait]
    impl PermissionProvider for Null {
        async fn check_status(&self, _capability: Capability) -> PermissionStatus {
            PermissionStatus::Granted
        }

        async fn request(&self, _capability: Capability) -> PermissionStatus {
            PermissionStatus::Granted
        }

        fn should_show_rationale(&self, _capability: Capability) -> bool {
            false
        }
    }

    /// Runs the executor directly, for any slot kind.
    struct Inline(SlotKind);

    #[async_trait]
    impl Strategy for Inline {
        fn name(&self) -> &'static str {
            "inline"
        }

        fn kind(&self) -> SlotKind {
            self.0
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
            let token = cancel.clone();
            Ok(ctx.drive(RunId::new(), slot, cancel, async move {
                executor::run(work.as_ref(), &token, schedule).await
            }))
        }
    }

    #[derive(Default)]
    struct Alarms(Mutex<HashSet<String>>);

    impl Alarms {
        fn is_armed(&self, workload: &str) -> bool {
            self.0.lock().unwrap().contains(workload)
        }
    }

    impl AlarmHost for Alarms {
        fn schedule(&self, _after: Duration, request: RestartRequest) -> Result<(), HostError> {
            self.0.lock().unwrap().insert(request.workload);
            Ok(())
        }

        fn cancel(&self, workload: &str) -> bool {
            self.0.lock().unwrap().remove(workload)
        }
    }

    /// Finishes its iteration as the stop lands and re-arms the restart alarm.
    struct LateRearm;

    #[async_trait]
    impl Strategy for LateRearm {
        fn name(&self) -> &'static str {
            "late-rearm"
        }

        fn kind(&self) -> SlotKind {
            SlotKind::Service
        }

        async fn launch(
            &self,
            req: LaunchRequest,
            ctx: &StrategyContext,
        ) -> Result<RunHandle, CoreError> {
            let alarms = Arc::clone(&ctx.host.alarms);
            let request = RestartRequest::new(req.slot.name.clone(), req.schedule);
            let token = req.cancel.clone();
            Ok(ctx.drive(RunId::new(), req.slot, req.cancel, async move {
                token.cancelled().await;
                let _ = alarms.schedule(Duration::from_secs(60), request);
                Outcome::Completed
            }))
        }
    }

    fn host(flags: Arc<MemoryFlagStore>) -> Host {
        let null = Arc::new(Null);
        Host {
            jobs: null.clone(),
            services: null.clone(),
            power: null.clone(),
            alarms: null.clone(),
            flags,
            permissions: null,
        }
    }

    fn runner(flags: Arc<MemoryFlagStore>) -> TaskRunner {
        TaskRunner::builder(host(flags))
            .with_strategy(Arc::new(Inline(SlotKind::Task)))
            .with_strategy(Arc::new(Inline(SlotKind::Worker)))
            .with_strategy(Arc::new(Inline(SlotKind::Service)))
            .build()
            .unwrap()
    }

    fn ticking(counter: Arc<AtomicUsize>) -> WorkRef {
        WorkFn::arc("tick", move |_ctx: CancellationToken| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, WorkError>(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn service_start_is_exclusive() {
        let flags = Arc::new(MemoryFlagStore::new());
        let r = runner(flags.clone());
        let counter = Arc::new(AtomicUsize::new(0));

        let first = r
            .start_service(ticking(counter.clone()), "gps", Schedule::every_ms(1_000))
            .await
            .unwrap();
        assert!(flags.get("gps").unwrap());

        let err = r
            .start_service(ticking(counter.clone()), "gps", Schedule::every_ms(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRunning { .. }));
        assert!(err.is_benign());
        assert!(!first.is_cancelled());

        assert!(r.stop_service("gps").await);
        assert!(!flags.get("gps").unwrap());
        assert_eq!(r.slot_state(&SlotKey::service("gps")), SlotState::Idle);
        assert_eq!(first.join().await, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn stop_never_started_is_a_noop() {
        let r = runner(Arc::new(MemoryFlagStore::new()));
        assert!(r.stop_service("nothing").await);
        assert!(!r.cancel_worker("nothing").await);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_replaces_live_run() {
        let r = runner(Arc::new(MemoryFlagStore::new()));
        let counter = Arc::new(AtomicUsize::new(0));

        let old = r
            .run_worker(ticking(counter.clone()), CancellationToken::new(), Schedule::every_ms(500))
            .await
            .unwrap();
        let new = r
            .run_worker(ticking(counter.clone()), CancellationToken::new(), Schedule::every_ms(500))
            .await
            .unwrap();

        assert_eq!(old.join().await, Outcome::Cancelled);
        let key = SlotKey::worker("tasky-worker");
        assert_eq!(r.slot_state(&key), SlotState::Running);
        assert_eq!(r.slot_info(&key).and_then(|i| i.run_id), Some(new.id()));

        assert!(r.cancel_worker("tasky-worker").await);
        assert_eq!(new.join().await, Outcome::Cancelled);
        assert!(r.live_slots().is_empty());
    }

    #[tokio::test]
    async fn stop_disarms_an_alarm_rearmed_while_stopping() {
        let alarms = Arc::new(Alarms::default());
        let mut h = host(Arc::new(MemoryFlagStore::new()));
        h.alarms = alarms.clone();
        let r = TaskRunner::builder(h)
            .with_strategy(Arc::new(LateRearm))
            .build()
            .unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        r.start_service(ticking(counter), "gps", Schedule::every_ms(5_000))
            .await
            .unwrap();
        assert!(r.stop_service("gps").await);
        assert!(!alarms.is_armed("gps"));
    }

    #[tokio::test]
    async fn missing_strategy_fails_the_slot() {
        let r = TaskRunner::builder(host(Arc::new(MemoryFlagStore::new())))
            .build()
            .unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let err = r
            .start_service(ticking(counter), "gps", Schedule::once())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoStrategy(SlotKind::Service)));
        assert_eq!(r.slot_state(&SlotKey::service("gps")), SlotState::Failed);
        assert!(!r.should_resume("gps").unwrap());
    }

    #[tokio::test]
    async fn resume_requires_the_flag() {
        let flags = Arc::new(MemoryFlagStore::new());
        let r = runner(flags.clone());
        let counter = Arc::new(AtomicUsize::new(0));

        let none = r
            .resume_service(ticking(counter.clone()), "gps", Schedule::once())
            .await
            .unwrap();
        assert!(none.is_none());

        flags.set("gps", true).unwrap();
        let handle = r
            .resume_service(ticking(counter.clone()), "gps", Schedule::once())
            .await
            .unwrap()
            .expect("flag was set");
        assert_eq!(handle.join().await, Outcome::Completed);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_cover_the_run() {
        let r = runner(Arc::new(MemoryFlagStore::new()));
        let mut rx = r.subscribe();
        let counter = Arc::new(AtomicUsize::new(0));

        let h = r
            .run_task(ticking(counter), CancellationToken::new(), Schedule::once())
            .await
            .unwrap();
        let id = h.id();
        assert_eq!(h.join().await, Outcome::Completed);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.run_id, id);
        assert_eq!(ev.status, RunStatus::Completed);
        assert_eq!(ev.slot, SlotKey::task("tick"));
    }

    #[tokio::test]
    async fn stop_action_stops_the_service() {
        let flags = Arc::new(MemoryFlagStore::new());
        let r = runner(flags.clone());
        let stop = CancellationToken::new();
        let seen = stop.clone();
        let work: WorkRef = WorkFn::arc("wait", move |ctx: CancellationToken| {
            let seen = seen.clone();
            async move {
                ctx.cancelled().await;
                seen.cancel();
                Ok::<_, WorkError>(())
            }
        });

        let _h = r.start_service(work, "gps", Schedule::once()).await.unwrap();
        assert!(r.handle_service_action("gps", ServiceAction::Pause).await);
        assert!(!stop.is_cancelled());

        assert!(r.handle_service_action("gps", ServiceAction::Stop).await);
        assert!(stop.is_cancelled());
        assert!(!flags.get("gps").unwrap());
    }
}
