//! Telemetry relay: a best-effort TCP side-channel that mirrors log lines to a remote listener.
//!
//! ```text
//! Diagnostics::log ──► RelayClient::send (spawned, never awaited by the caller)
//!                          │  connect ─► write "PING: <line>" ─► read ≤ 4096 bytes ─► close
//!                          ▼
//!                     RelayListener  (answers every read with "PONG")
//! ```
//!
//! One connection per message, no pooling, no retry. Failures are logged locally and dropped.

mod config;
pub use config::{ListenerConfig, RelayConfig};

mod errors;
pub use errors::RelayError;

mod frame;
pub use frame::{FRAME_PREFIX, decode_ascii, encode_ascii, encode_frame};

mod client;
pub use client::RelayClient;

mod listener;
pub use listener::RelayListener;
