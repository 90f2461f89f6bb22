//! The single `Log` entry point.
//!
//! [`Diagnostics::log`] formats `Thread-<n>-<tag> <message>`, emits it through `tracing`
//! and mirrors it, prefixed with an RFC 3339 timestamp, to the relay listener.
//! Relay delivery runs in the background and never affects the caller.

use std::{
    error::Error as StdError,
    panic::Location,
    sync::atomic::{AtomicU64, Ordering},
};

use tasky_relay::RelayClient;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};

static NEXT_THREAD: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_NO: u64 = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
}

/// Small, stable per-process number of the calling thread.
pub fn thread_no() -> u64 {
    THREAD_NO.with(|n| *n)
}

#[derive(Clone, Debug)]
pub struct Diagnostics {
    relay: RelayClient,
}

impl Diagnostics {
    pub fn new(relay: RelayClient) -> Self {
        Self { relay }
    }

    /// Logs locally only.
    pub fn local() -> Self {
        Self::new(RelayClient::disabled())
    }

    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    /// Logs `message` under `tag`, with an optional error attached.
    ///
    /// An empty `tag` is replaced by the caller's `file:line`.
    #[track_caller]
    pub fn log(&self, message: &str, tag: &str, error: Option<&dyn StdError>) {
        let caller = Location::caller();
        let line = format_line(thread_no(), tag, caller, message);

        let line = match error {
            Some(e) => {
                warn!(target: "tasky", caller = %caller, error = %e, "{line}");
                format!("{line}: {e}")
            }
            None => {
                info!(target: "tasky", caller = %caller, "{line}");
                line
            }
        };

        if self.relay.is_enabled() {
            self.relay.send(format!("{}- {line}", timestamp()));
        }
    }
}

fn format_line(thread: u64, tag: &str, caller: &Location<'_>, message: &str) -> String {
    if tag.is_empty() {
        format!(
            "Thread-{thread}-{}:{} {message}",
            caller.file(),
            caller.line()
        )
    } else {
        format!("Thread-{thread}-{tag} {message}")
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&Rfc3339).unwrap_or_default()
}
