//! WorkloadFlag stores.
//!
//! - [`MemoryFlagStore`]: process-local, for tests and hosts without persistence.
//! - [`FileFlagStore`]: a JSON object `{ "<workload>": true }` on disk that survives restarts.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::debug;

use crate::{error::HostError, host::FlagStore};

#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<BTreeMap<String, bool>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, workload: &str) -> Result<bool, HostError> {
        let flags = self.flags.lock().unwrap_or_else(|e| e.into_inner());
        Ok(flags.get(workload).copied().unwrap_or(false))
    }

    fn set(&self, workload: &str, running: bool) -> Result<(), HostError> {
        let mut flags = self.flags.lock().unwrap_or_else(|e| e.into_inner());
        flags.insert(workload.to_string(), running);
        Ok(())
    }
}

/// File-backed flag store.
///
/// Every `set` rewrites the whole file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    cache: Mutex<BTreeMap<String, bool>>,
}

impl FileFlagStore {
    /// Opens (or lazily creates) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HostError> {
        let path = path.into();
        let cache = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), flags = cache.len(), "workload flags loaded");
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, flags: &BTreeMap<String, bool>) -> Result<(), HostError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(flags)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, workload: &str) -> Result<bool, HostError> {
        let flags = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Ok(flags.get(workload).copied().unwrap_or(false))
    }

    /// The cache only changes once the file has been written.
    fn set(&self, workload: &str, running: bool) -> Result<(), HostError> {
        let mut flags = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if flags.get(workload) == Some(&running) {
            return Ok(());
        }
        let mut next = flags.clone();
        next.insert(workload.to_string(), running);
        self.persist(&next)?;
        *flags = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_defaults_to_false() {
        let store = MemoryFlagStore::new();
        assert!(!store.get("gps").unwrap());
        store.set("gps", true).unwrap();
        assert!(store.get("gps").unwrap());
        store.set("gps", false).unwrap();
        assert!(!store.get("gps").unwrap());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("flags.json");

        let store = FileFlagStore::open(&path).unwrap();
        store.set("gps", true).unwrap();
        store.set("sync", false).unwrap();
        drop(store);

        let reopened = FileFlagStore::open(&path).unwrap();
        assert!(reopened.get("gps").unwrap());
        assert!(!reopened.get("sync").unwrap());
        assert!(!reopened.get("unknown").unwrap());
    }

    #[test]
    fn failed_write_leaves_the_flag_unset() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("state");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("flags.json");

        let store = FileFlagStore::open(&path).unwrap();
        assert!(matches!(store.set("gps", true), Err(HostError::Io(_))));
        assert!(!store.get("gps").unwrap());

        fs::remove_file(&blocker).unwrap();
        store.set("gps", true).unwrap();
        assert!(path.exists());
        assert!(store.get("gps").unwrap());

        let reopened = FileFlagStore::open(&path).unwrap();
        assert!(reopened.get("gps").unwrap());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FileFlagStore::open(&path), Err(HostError::Serde(_))));
    }
}
