use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use anyhow::Context;
use tracing::info;

use tasky_core::{
    CoreError, Diagnostics, FileFlagStore, RunnerConfig, TaskRunner, WorkError, WorkFn, WorkRef,
};
use tasky_exec::{LocalHost, LocalPermissions, Watchdog, default_router};
use tasky_model::{Capability, PermissionStatus, Schedule};
use tasky_observe::{EventLogger, LoggerConfig, logger_init};
use tasky_relay::{RelayClient, RelayConfig};
use tokio_util::sync::CancellationToken;

const WORKLOAD: &str = "location-sync";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    logger_init(&LoggerConfig::from_env()?)?;
    info!("logger initialized");

    // 2) Host + persisted workload flags
    let permissions = LocalPermissions::new()
        .with_status(Capability::Notifications, PermissionStatus::Granted)
        .granting(Capability::LocationWhenInUse)
        .granting(Capability::LocationAlways);
    let (local, alarms) = LocalHost::with_permissions(permissions);
    let flags = FileFlagStore::open(std::env::temp_dir().join("tasky-agent-flags.json"))
        .context("open workload flag store")?;

    // 3) Runner; the relay target comes from TASKY_RELAY=host:port
    let relay = match std::env::var("TASKY_RELAY") {
        Ok(addr) => {
            let (host, port) = addr
                .rsplit_once(':')
                .context("TASKY_RELAY must be host:port")?;
            RelayClient::new(RelayConfig::new(host, port.parse().context("relay port")?))
        }
        Err(_) => RelayClient::disabled(),
    };
    let runner = TaskRunner::builder(local.host(Arc::new(flags)))
        .with_router(default_router())
        .with_config(RunnerConfig {
            escalate_prerequisites: true,
            ..Default::default()
        })
        .with_diagnostics(Diagnostics::new(relay))
        .build()?;
    info!("task runner ready");

    let shutdown = CancellationToken::new();
    EventLogger::new(runner.subscribe()).spawn(shutdown.clone());

    // 4) Watchdog for restart alarms
    let work = location_sync();
    let watchdog = Watchdog::new(runner.clone());
    watchdog.register(WORKLOAD, work.clone());
    watchdog.spawn(alarms, shutdown.clone());

    // 5) Permissions, then the supervised service
    runner.ensure_granted(Capability::LocationAlways).await?;
    let schedule = Schedule::every(Duration::from_secs(5));
    match runner.resume_service(work.clone(), WORKLOAD, schedule).await? {
        Some(handle) => info!(run_id = %handle.id(), "service resumed from workload flag"),
        None => match runner.start_service(work, WORKLOAD, schedule).await {
            Ok(handle) => info!(run_id = %handle.id(), "service started"),
            Err(e @ CoreError::AlreadyRunning { .. }) => info!("{e}"),
            Err(e) => return Err(e.into()),
        },
    }

    // 6) A one-off background task
    let hello: WorkRef = WorkFn::arc("hello", |_ctx: CancellationToken| async {
        info!("hello from a background task");
        Ok::<_, WorkError>(())
    });
    runner
        .run_task(hello, CancellationToken::new(), Schedule::once())
        .await?;

    // 7) Keep running
    runner.log("agent is running; press Ctrl+C to stop", "Agent", None);
    tokio::signal::ctrl_c().await?;
    info!("shutting down...");

    runner.shutdown().await;
    shutdown.cancel();
    Ok(())
}

fn location_sync() -> WorkRef {
    let fixes = Arc::new(AtomicU64::new(0));
    WorkFn::arc(WORKLOAD, move |ctx: CancellationToken| {
        let fixes = fixes.clone();
        async move {
            if ctx.is_cancelled() {
                return Err(WorkError::Canceled);
            }
            let n = fixes.fetch_add(1, Ordering::Relaxed) + 1;
            info!(fix = n, "location fix recorded");
            Ok(())
        }
    })
}
