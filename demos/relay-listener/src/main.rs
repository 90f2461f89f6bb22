use tracing::info;

use tasky_observe::{LoggerConfig, logger_init};
use tasky_relay::{ListenerConfig, RelayListener};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Logger
    logger_init(&LoggerConfig::from_env()?)?;

    // 2) Listener; the first argument overrides the bind address
    let mut cfg = ListenerConfig::default();
    if let Some(bind) = std::env::args().nth(1) {
        cfg.bind = bind;
    }
    let listener = RelayListener::bind(&cfg).await?;
    info!(addr = %listener.local_addr()?, reply = %cfg.reply, "relay listener ready");

    // 3) Serve until Ctrl+C
    let cancel = CancellationToken::new();
    let serve = tokio::spawn(listener.serve(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    cancel.cancel();
    serve.await??;

    Ok(())
}
