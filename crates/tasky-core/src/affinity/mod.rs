//! # Affinity thread.
//!
//! A dedicated OS thread with its own current-thread runtime that executes submitted
//! jobs one at a time, in submission order. It stands in for the UI thread of a mobile
//! host: anything that must run "on the UI thread" is marshalled here and awaited.
//!
//! ```text
//! caller ──run(f)──► mpsc ──► [affinity thread] job 1 ─► job 2 ─► ...
//!   ▲                                 │
//!   └──────────── oneshot ◄───────────┘
//! ```
//!
//! Calling [`AffinityThread::run`] from the affinity thread itself runs `f` inline.
//! A job whose caller stops waiting is dropped, so the thread moves on to the next one.
//! The thread exits once every handle is dropped.

use std::{future::Future, pin::Pin, sync::Arc, thread::ThreadId};

use tokio::{
    select,
    sync::{mpsc, oneshot},
};
use tracing::debug;

use crate::error::{CoreError, HostError};

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

#[derive(Clone)]
pub struct AffinityThread {
    tx: mpsc::UnboundedSender<Job>,
    thread: ThreadId,
    name: Arc<str>,
}

impl AffinityThread {
    pub fn spawn(name: impl Into<String>) -> Result<Self, CoreError> {
        let name: String = name.into();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(HostError::from)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let thread_name = name.clone();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                rt.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        job().await;
                    }
                });
                debug!(thread = %thread_name, "affinity thread stopped");
            })
            .map_err(HostError::from)?;

        Ok(Self {
            tx,
            thread: handle.thread().id(),
            name: Arc::from(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when called from the affinity thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread
    }

    /// Runs `f` on the affinity thread and waits for its result.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(f().await);
        }

        let (mut tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                select! {
                    out = f() => {
                        let _ = tx.send(out);
                    }
                    _ = tx.closed() => debug!("affinity job abandoned by its caller"),
                }
            })
        });
        self.tx.send(job).map_err(|_| CoreError::AffinityClosed)?;
        rx.await.map_err(|_| CoreError::AffinityClosed)
    }
}

impl std::fmt::Debug for AffinityThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityThread")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use super::*;

    #[tokio::test]
    async fn runs_on_the_named_thread() {
        let ui = AffinityThread::spawn("ui-test").unwrap();
        assert!(!ui.is_current());

        let name = ui
            .run(|| async { std::thread::current().name().map(str::to_string) })
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("ui-test"));
    }

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let ui = AffinityThread::spawn("ui-order").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut waits = Vec::new();
        for i in 0..5 {
            let seen = Arc::clone(&seen);
            let ui = ui.clone();
            waits.push(tokio::spawn(async move {
                ui.run(move || async move {
                    seen.lock().unwrap().push(i);
                })
                .await
            }));
            tokio::task::yield_now().await;
        }
        for w in waits {
            w.await.unwrap().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn abandoned_job_frees_the_thread() {
        let ui = AffinityThread::spawn("ui-abandon").unwrap();
        let stuck = ui.clone();
        let waiter = tokio::spawn(async move { stuck.run(std::future::pending::<()>).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        waiter.abort();
        let _ = waiter.await;

        let v = tokio::time::timeout(Duration::from_secs(2), ui.run(|| async { 7 }))
            .await
            .expect("affinity thread still busy with the abandoned job")
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn nested_run_executes_inline() {
        let ui = AffinityThread::spawn("ui-nested").unwrap();
        let inner = ui.clone();
        let v = ui
            .run(move || async move {
                assert!(inner.is_current());
                inner.run(|| async { 41 + 1 }).await
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v, 42);
    }
}
