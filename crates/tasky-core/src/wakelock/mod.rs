//! Wake lock held by a supervised service instance.
//!
//! Acquire and release are idempotent: acquiring while held and releasing while not
//! held are no-ops, so at most one host wake lock is ever held per instance.
//! [`WakeLock::scoped`] pairs them on every exit path, panics and aborts included.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{trace, warn};

use crate::host::PowerHost;

#[derive(Clone)]
pub struct WakeLock {
    inner: Arc<Inner>,
}

struct Inner {
    power: Option<Arc<dyn PowerHost>>,
    tag: String,
    held: AtomicBool,
}

impl WakeLock {
    pub fn new(power: Arc<dyn PowerHost>, tag: impl Into<String>) -> Self {
        Self::build(Some(power), tag.into())
    }

    /// A lock that never touches the host; used where the OS exempts foreground services.
    pub fn noop(tag: impl Into<String>) -> Self {
        Self::build(None, tag.into())
    }

    fn build(power: Option<Arc<dyn PowerHost>>, tag: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                power,
                tag,
                held: AtomicBool::new(false),
            }),
        }
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// Acquires the lock. Returns `true` if this call took it.
    pub fn acquire(&self) -> bool {
        let Some(power) = &self.inner.power else {
            return false;
        };
        if self
            .inner
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!(tag = %self.inner.tag, "wake lock already held");
            return false;
        }

        match power.acquire_wake_lock(&self.inner.tag) {
            Ok(()) => {
                trace!(tag = %self.inner.tag, "wake lock acquired");
                true
            }
            Err(e) => {
                self.inner.held.store(false, Ordering::Release);
                warn!(tag = %self.inner.tag, label = e.as_label(), "wake lock acquire failed: {e}");
                false
            }
        }
    }

    /// Releases the lock. Returns `true` if this call released it.
    pub fn release(&self) -> bool {
        if !self.inner.held.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(power) = &self.inner.power {
            power.release_wake_lock(&self.inner.tag);
        }
        trace!(tag = %self.inner.tag, "wake lock released");
        true
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.inner.held.load(Ordering::Acquire)
    }

    /// Number of host locks this instance holds: 0 or 1.
    #[inline]
    pub fn held_count(&self) -> usize {
        usize::from(self.is_held())
    }

    /// Acquires the lock and returns a guard that releases it on drop.
    pub fn scoped(&self) -> WakeLockGuard {
        self.acquire();
        WakeLockGuard { lock: self.clone() }
    }
}

impl std::fmt::Debug for WakeLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeLock")
            .field("tag", &self.inner.tag)
            .field("held", &self.is_held())
            .finish()
    }
}

/// Releases its [`WakeLock`] on drop.
#[must_use = "the wake lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct WakeLockGuard {
    lock: WakeLock,
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::error::HostError;

    #[derive(Default)]
    struct CountingPower {
        acquired: AtomicUsize,
        released: AtomicUsize,
        fail: bool,
    }

    impl PowerHost for CountingPower {
        fn acquire_wake_lock(&self, _tag: &str) -> Result<(), HostError> {
            if self.fail {
                return Err(HostError::Unavailable("power".into()));
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release_wake_lock(&self, _tag: &str) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn acquire_and_release_are_idempotent() {
        let power = Arc::new(CountingPower::default());
        let lock = WakeLock::new(power.clone(), "svc");

        assert!(lock.acquire());
        assert!(!lock.acquire());
        assert_eq!(lock.held_count(), 1);

        assert!(lock.release());
        assert!(!lock.release());
        assert_eq!(lock.held_count(), 0);

        assert_eq!(power.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(power.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_releases_on_panic() {
        let power = Arc::new(CountingPower::default());
        let lock = WakeLock::new(power.clone(), "svc");

        let l = lock.clone();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = l.scoped();
            panic!("work blew up");
        }));
        assert!(res.is_err());
        assert!(!lock.is_held());
        assert_eq!(power.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_acquire_is_not_held() {
        let power = Arc::new(CountingPower {
            fail: true,
            ..Default::default()
        });
        let lock = WakeLock::new(power, "svc");
        assert!(!lock.acquire());
        assert!(!lock.is_held());
    }

    #[test]
    fn noop_lock_never_holds() {
        let lock = WakeLock::noop("svc");
        let _guard = lock.scoped();
        assert_eq!(lock.held_count(), 0);
    }
}
