use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::ListenerConfig,
    errors::RelayError,
    frame::{decode_ascii, encode_ascii},
};

const READ_CHUNK: usize = 4096;
/// Pause after a failed `accept` (e.g. out of file descriptors) before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Receiving end of the relay: prints what devices send and answers with `PONG`.
pub struct RelayListener {
    listener: TcpListener,
    reply: Arc<[u8]>,
    sink: Option<mpsc::UnboundedSender<String>>,
}

impl RelayListener {
    pub async fn bind(cfg: &ListenerConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(cfg.bind.as_str()).await?;
        let reply: Arc<[u8]> = Arc::from(encode_ascii(&cfg.reply));
        Ok(Self {
            listener,
            reply,
            sink: None,
        })
    }

    /// Forwards every received chunk (decoded as ASCII) to `sink`.
    pub fn with_sink(mut self, sink: mpsc::UnboundedSender<String>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `cancel` fires. Each connection is served on its own task.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), RelayError> {
        let addr = self.local_addr()?;
        info!(target: "tasky.relay", %addr, "started listening for relay connections");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(target: "tasky.relay", %peer, "connected to client");
                        let reply = Arc::clone(&self.reply);
                        let sink = self.sink.clone();
                        let cancel = cancel.child_token();
                        tokio::spawn(async move {
                            serve_connection(stream, peer, reply, sink, cancel).await;
                        });
                    }
                    Err(e) => {
                        warn!(target: "tasky.relay", "accept failed: {e}");
                        if !accept_backoff(&cancel).await {
                            break;
                        }
                    }
                }
            }
        }

        info!(target: "tasky.relay", %addr, "relay listener stopped");
        Ok(())
    }
}

/// `false` when `cancel` fired before the backoff elapsed.
async fn accept_backoff(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    reply: Arc<[u8]>,
    sink: Option<mpsc::UnboundedSender<String>>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => break,
            read = stream.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(target: "tasky.relay", %peer, "read failed: {e}");
                    break;
                }
            }
        };

        let text = decode_ascii(&buf[..n]);
        info!(target: "tasky.relay", %peer, "received: {text}");
        if let Some(sink) = &sink {
            let _ = sink.send(text);
        }

        if let Err(e) = stream.write_all(&reply).await {
            debug!(target: "tasky.relay", %peer, "reply failed: {e}");
            break;
        }
    }
    debug!(target: "tasky.relay", %peer, "connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RelayClient, RelayConfig};

    async fn spawn_listener() -> (SocketAddr, mpsc::UnboundedReceiver<String>, CancellationToken) {
        let cfg = ListenerConfig {
            bind: "127.0.0.1:0".into(),
            ..Default::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = RelayListener::bind(&cfg).await.unwrap().with_sink(tx);
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        tokio::spawn(listener.serve(cancel.clone()));
        (addr, rx, cancel)
    }

    #[tokio::test]
    async fn accept_backoff_waits_unless_cancelled() {
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();
        assert!(accept_backoff(&cancel).await);
        assert!(started.elapsed() >= ACCEPT_BACKOFF);

        cancel.cancel();
        let started = tokio::time::Instant::now();
        assert!(!accept_backoff(&cancel).await);
        assert!(started.elapsed() < ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn answers_client_with_pong() {
        let (addr, mut rx, cancel) = spawn_listener().await;
        let client = RelayClient::new(RelayConfig::new("127.0.0.1", addr.port()));

        assert_eq!(client.exchange("hello").await.unwrap(), "PONG");
        assert_eq!(rx.recv().await.unwrap(), "PING: hello");
        cancel.cancel();
    }

    #[tokio::test]
    async fn concurrent_sends_open_independent_connections() {
        let (addr, mut rx, cancel) = spawn_listener().await;
        let client = RelayClient::new(RelayConfig::new("127.0.0.1", addr.port()));

        for i in 0..5 {
            client.send(format!("line {i}"));
        }

        let mut got = Vec::new();
        for _ in 0..5 {
            let line = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            got.push(line);
        }
        got.sort();
        let expected: Vec<String> = (0..5).map(|i| format!("PING: line {i}")).collect();
        assert_eq!(got, expected);
        cancel.cancel();
    }

    #[tokio::test]
    async fn serve_returns_after_cancel() {
        let cfg = ListenerConfig {
            bind: "127.0.0.1:0".into(),
            ..Default::default()
        };
        let listener = RelayListener::bind(&cfg).await.unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(listener.serve(cancel.clone()));

        cancel.cancel();
        let res = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(matches!(res, Ok(Ok(Ok(())))));
    }
}
