//! # Work units.
//!
//! A [`Work`] is a stateless async function of a [`CancellationToken`]. Every call to
//! [`Work::spawn`] produces a fresh future, so the same unit can be invoked once per
//! iteration of an interval loop without hidden shared state.
//!
//! [`WorkFn`] wraps a closure `Fn(CancellationToken) -> Fut`; [`WorkRef`] is the shared
//! handle passed around the runtime.
//!
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use tasky_core::{WorkError, WorkFn, WorkRef};
//!
//! let w: WorkRef = WorkFn::arc("sync-location", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(WorkError::Canceled);
//!     }
//!     Ok(())
//! });
//! assert_eq!(w.name(), "sync-location");
//! ```

use std::{borrow::Cow, future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::error::WorkError;

/// Boxed future returned by [`Work::spawn`].
pub type BoxWorkFuture = Pin<Box<dyn Future<Output = Result<(), WorkError>> + Send + 'static>>;

/// Shared handle to a work unit.
pub type WorkRef = Arc<dyn Work>;

/// Asynchronous, cancelable unit of background work.
///
/// Implementations should check the token and return promptly once it fires; the
/// runtime never interrupts a running invocation on its own.
pub trait Work: Send + Sync + 'static {
    /// Stable, human-readable name, used in logs and events.
    fn name(&self) -> &str;

    /// Creates the future for one invocation.
    fn spawn(&self, cancel: CancellationToken) -> BoxWorkFuture;
}

/// Function-backed work unit.
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the work unit and returns it as a [`WorkRef`]-compatible `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Work for WorkFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, cancel: CancellationToken) -> BoxWorkFuture {
        Box::pin((self.f)(cancel))
    }
}

impl<F> std::fmt::Debug for WorkFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkFn").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn each_spawn_creates_a_fresh_future() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let work: WorkRef = WorkFn::arc("counter", move |_ctx: CancellationToken| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let ctx = CancellationToken::new();
        work.spawn(ctx.clone()).await.unwrap();
        work.spawn(ctx).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(work.name(), "counter");
    }

    #[tokio::test]
    async fn error_is_passed_through() {
        let work: WorkRef =
            WorkFn::arc("broken", |_ctx| async { Err(WorkError::fail("no fix")) });
        let res = work.spawn(CancellationToken::new()).await;
        assert_eq!(res, Err(WorkError::fail("no fix")));
    }
}
