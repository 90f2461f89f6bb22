use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use tasky_model::{RunId, RunStatus, SlotKey, SlotKind, SlotState};
use tokio::sync::Mutex;
use tracing::trace;

use crate::handle::RunWatch;

/// Point-in-time view of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub key: SlotKey,
    pub state: SlotState,
    pub run_id: Option<RunId>,
    pub updated_at: SystemTime,
}

/// In-memory slot map: one entry per logical task/worker/service slot.
///
/// Each entry owns a [`RunWatch`] for the run occupying it. Lifecycle operations that
/// await (replace, stop) serialize per slot through [`SlotMap::lock`].
#[derive(Clone, Default)]
pub struct SlotMap {
    inner: Arc<RwLock<SlotMapInner>>,
}

#[derive(Default)]
struct SlotMapInner {
    slots: HashMap<SlotKey, SlotEntry>,
    locks: HashMap<SlotKey, Arc<Mutex<()>>>,
}

struct SlotEntry {
    state: SlotState,
    run: Option<RunWatch>,
    updated_at: SystemTime,
}

impl SlotEntry {
    fn idle() -> Self {
        Self {
            state: SlotState::Idle,
            run: None,
            updated_at: SystemTime::now(),
        }
    }

    fn set(&mut self, key: &SlotKey, next: SlotState) {
        if !self.state.can_transition(next) {
            trace!(slot = %key, from = ?self.state, to = ?next, "slot transition outside the state graph");
        }
        self.state = next;
        self.updated_at = SystemTime::now();
    }
}

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SlotMapInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotMapInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Per-slot async lock for lifecycle operations on `key`.
    pub fn lock(&self, key: &SlotKey) -> Arc<Mutex<()>> {
        let mut inner = self.write();
        Arc::clone(inner.locks.entry(key.clone()).or_default())
    }

    /// Current state of `key`; unknown slots are `Idle`.
    pub fn state(&self, key: &SlotKey) -> SlotState {
        self.read()
            .slots
            .get(key)
            .map(|e| e.state)
            .unwrap_or_default()
    }

    pub fn info(&self, key: &SlotKey) -> Option<SlotInfo> {
        self.read().slots.get(key).map(|e| SlotInfo {
            key: key.clone(),
            state: e.state,
            run_id: e.run.as_ref().map(|r| r.id()),
            updated_at: e.updated_at,
        })
    }

    /// Claims `key` for a new run (`Idle | Failed → Starting`).
    ///
    /// Fails with the current state when the slot is live.
    pub fn begin(&self, key: &SlotKey) -> Result<(), SlotState> {
        let mut inner = self.write();
        let entry = inner
            .slots
            .entry(key.clone())
            .or_insert_with(SlotEntry::idle);

        if entry.state.is_live() {
            return Err(entry.state);
        }
        if entry.state == SlotState::Failed {
            entry.set(key, SlotState::Idle);
        }
        entry.run = None;
        entry.set(key, SlotState::Starting);
        Ok(())
    }

    /// Records the launched run (`Starting → Running`).
    pub fn attach(&self, key: &SlotKey, run: RunWatch) {
        let mut inner = self.write();
        let entry = inner
            .slots
            .entry(key.clone())
            .or_insert_with(SlotEntry::idle);
        entry.run = Some(run);
        entry.set(key, SlotState::Running);
    }

    /// Marks a launch that never produced a run (`Starting → Failed`).
    pub fn fail(&self, key: &SlotKey) {
        if let Some(entry) = self.write().slots.get_mut(key) {
            entry.run = None;
            entry.set(key, SlotState::Failed);
        }
    }

    /// Detaches the live run from `key` for stopping (`→ Stopping`).
    pub fn take(&self, key: &SlotKey) -> Option<RunWatch> {
        let mut inner = self.write();
        let entry = inner.slots.get_mut(key)?;
        if !entry.state.is_live() {
            return None;
        }
        let run = entry.run.take()?;
        entry.set(key, SlotState::Stopping);
        Some(run)
    }

    /// Settles a stopped slot (`Stopping → Idle`).
    pub fn release(&self, key: &SlotKey) {
        if let Some(entry) = self.write().slots.get_mut(key)
            && entry.state == SlotState::Stopping
        {
            entry.set(key, SlotState::Idle);
        }
    }

    /// Settles `key` after run `id` ended on its own.
    ///
    /// Ignored when the slot already holds a different run. Returns whether it applied.
    pub fn finish(&self, key: &SlotKey, id: RunId, status: RunStatus) -> bool {
        let mut inner = self.write();
        let Some(entry) = inner.slots.get_mut(key) else {
            return false;
        };
        if entry.run.as_ref().map(|r| r.id()) != Some(id) {
            return false;
        }

        entry.run = None;
        let next = match status {
            RunStatus::Failed => SlotState::Failed,
            _ => SlotState::Idle,
        };
        entry.set(key, next);
        true
    }

    /// Slots currently occupied by a run, sorted by key.
    pub fn live(&self) -> Vec<SlotKey> {
        let inner = self.read();
        let mut keys: Vec<SlotKey> = inner
            .slots
            .iter()
            .filter(|(_, e)| e.state.is_live())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort_by_key(|k| k.to_string());
        keys
    }

    /// All known slots of `kind`.
    pub fn list_by_kind(&self, kind: SlotKind) -> Vec<SlotInfo> {
        let inner = self.read();
        let mut out: Vec<SlotInfo> = inner
            .slots
            .iter()
            .filter(|(k, _)| k.kind == kind)
            .map(|(k, e)| SlotInfo {
                key: k.clone(),
                state: e.state,
                run_id: e.run.as_ref().map(|r| r.id()),
                updated_at: e.updated_at,
            })
            .collect();
        out.sort_by_key(|i| i.key.to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{executor::Outcome, handle::RunHandle};

    fn idle_run(key: &SlotKey) -> RunHandle {
        let cancel = CancellationToken::new();
        let c = cancel.clone();
        RunHandle::spawn(key.clone(), cancel, async move {
            c.cancelled().await;
            Outcome::Cancelled
        })
    }

    #[test]
    fn unknown_slot_is_idle() {
        let map = SlotMap::new();
        assert_eq!(map.state(&SlotKey::service("gps")), SlotState::Idle);
        assert!(map.info(&SlotKey::service("gps")).is_none());
        assert!(map.live().is_empty());
    }

    #[tokio::test]
    async fn begin_rejects_live_slot() {
        let map = SlotMap::new();
        let key = SlotKey::service("gps");

        map.begin(&key).unwrap();
        assert_eq!(map.begin(&key), Err(SlotState::Starting));

        let run = idle_run(&key);
        map.attach(&key, run.watch());
        assert_eq!(map.state(&key), SlotState::Running);
        assert_eq!(map.begin(&key), Err(SlotState::Running));
        assert_eq!(map.live(), vec![key.clone()]);
        run.cancel();
    }

    #[tokio::test]
    async fn take_then_release_returns_to_idle() {
        let map = SlotMap::new();
        let key = SlotKey::worker("sync");
        map.begin(&key).unwrap();
        let run = idle_run(&key);
        map.attach(&key, run.watch());

        let mut watch = map.take(&key).expect("live run");
        assert_eq!(map.state(&key), SlotState::Stopping);
        assert!(map.take(&key).is_none());

        watch.cancel();
        assert_eq!(watch.finished().await, Outcome::Cancelled);
        map.release(&key);
        assert_eq!(map.state(&key), SlotState::Idle);
    }

    #[tokio::test]
    async fn finish_ignores_stale_run() {
        let map = SlotMap::new();
        let key = SlotKey::worker("sync");

        map.begin(&key).unwrap();
        let old = idle_run(&key);
        map.attach(&key, old.watch());
        let _ = map.take(&key);
        map.release(&key);

        map.begin(&key).unwrap();
        let new = idle_run(&key);
        map.attach(&key, new.watch());

        assert!(!map.finish(&key, old.id(), RunStatus::Cancelled));
        assert_eq!(map.state(&key), SlotState::Running);

        assert!(map.finish(&key, new.id(), RunStatus::Failed));
        assert_eq!(map.state(&key), SlotState::Failed);
        assert!(map.begin(&key).is_ok());

        old.cancel();
        new.cancel();
    }

    #[test]
    fn failed_launch_frees_the_slot() {
        let map = SlotMap::new();
        let key = SlotKey::service("gps");
        map.begin(&key).unwrap();
        map.fail(&key);
        assert_eq!(map.state(&key), SlotState::Failed);
        assert!(map.live().is_empty());
        assert!(map.begin(&key).is_ok());
    }

    #[test]
    fn list_by_kind_filters() {
        let map = SlotMap::new();
        map.begin(&SlotKey::service("a")).unwrap();
        map.begin(&SlotKey::service("b")).unwrap();
        map.begin(&SlotKey::worker("c")).unwrap();

        let services = map.list_by_kind(SlotKind::Service);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].key, SlotKey::service("a"));
        assert_eq!(map.list_by_kind(SlotKind::Worker).len(), 1);
    }

    #[test]
    fn lock_is_shared_per_key() {
        let map = SlotMap::new();
        let a = map.lock(&SlotKey::service("gps"));
        let b = map.lock(&SlotKey::service("gps"));
        let c = map.lock(&SlotKey::worker("gps"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
