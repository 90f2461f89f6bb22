use std::sync::Arc;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::{debug, trace};

use crate::{
    config::RelayConfig,
    errors::RelayError,
    frame::{decode_ascii, encode_frame},
};

/// Fire-and-forget relay client.
///
/// Cloning is cheap; clones share the same configuration.
#[derive(Clone, Debug)]
pub struct RelayClient {
    cfg: Arc<RelayConfig>,
}

impl RelayClient {
    pub fn new(cfg: RelayConfig) -> Self {
        Self { cfg: Arc::new(cfg) }
    }

    /// Client that drops everything.
    pub fn disabled() -> Self {
        Self::new(RelayConfig::disabled())
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.cfg.enabled
    }

    pub fn config(&self) -> &RelayConfig {
        &self.cfg
    }

    /// Mirrors `line` to the listener in the background and returns immediately.
    ///
    /// Never fails and never blocks: delivery runs on a spawned task bounded by the
    /// configured timeouts. Outside a tokio runtime the line is dropped.
    pub fn send(&self, line: impl Into<String>) {
        if !self.cfg.enabled {
            return;
        }
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            trace!(target: "tasky.relay", "no async runtime; relay line dropped");
            return;
        };

        let cfg = Arc::clone(&self.cfg);
        let line = line.into();
        rt.spawn(async move {
            if let Err(e) = exchange(&cfg, &line).await {
                debug!(
                    target: "tasky.relay",
                    host = %cfg.host,
                    port = cfg.port,
                    label = e.as_label(),
                    "relay delivery failed: {e}"
                );
            }
        });
    }

    /// Delivers one line and waits for the listener's answer.
    ///
    /// This is the awaited form of [`RelayClient::send`]; it surfaces the error instead of logging it.
    pub async fn exchange(&self, line: &str) -> Result<String, RelayError> {
        exchange(&self.cfg, line).await
    }
}

async fn exchange(cfg: &RelayConfig, line: &str) -> Result<String, RelayError> {
    let connect = TcpStream::connect((cfg.host.as_str(), cfg.port));
    let mut stream = timeout(cfg.connect_timeout(), connect)
        .await
        .map_err(|_| RelayError::Timeout {
            stage: "connect",
            after: cfg.connect_timeout(),
        })?
        .map_err(RelayError::Connect)?;
    trace!(target: "tasky.relay", host = %cfg.host, port = cfg.port, "connected to relay listener");

    let frame = encode_frame(line);
    timeout(cfg.io_timeout(), stream.write_all(&frame))
        .await
        .map_err(|_| RelayError::Timeout {
            stage: "write",
            after: cfg.io_timeout(),
        })??;
    trace!(target: "tasky.relay", bytes = frame.len(), "sent");

    let mut buf = vec![0u8; cfg.max_response_bytes.max(1)];
    let n = timeout(cfg.io_timeout(), stream.read(&mut buf))
        .await
        .map_err(|_| RelayError::Timeout {
            stage: "read",
            after: cfg.io_timeout(),
        })??;

    let response = decode_ascii(&buf[..n]);
    trace!(target: "tasky.relay", %response, "received");
    Ok(response)
}
