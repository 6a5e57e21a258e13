//! Byte stores
//!
//! The entry store keeps its whole collection in one string blob. A
//! [`ByteStore`] is anything that can hold such blobs by key: the
//! in-memory [`MemoryStore`], the directory-backed [`FileStore`], or a
//! per-context handle onto a shared origin
//! ([`ContextStore`](super::origin::ContextStore)).

use crate::error::{Error, Result};
use crate::storage::origin::StorageEvents;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Synchronous get/set/remove over string blobs.
pub trait ByteStore: Send + Sync {
    /// Returns the blob stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous blob.
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes the blob under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Storage-change events written by other contexts sharing this store.
    ///
    /// Stores with no notion of other contexts return `None`.
    fn external_changes(&self) -> Option<StorageEvents> {
        None
    }
}

/// Process-local blob storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl ByteStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.blobs.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling that is renamed over the target, so a
/// reader never sees a half-written blob.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let invalid = key.is_empty()
            || key == "."
            || key.contains("..")
            || key.contains(['/', '\\', '\0']);
        if invalid {
            return Err(Error::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl ByteStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1".into()).unwrap();
        store.set("k", "v2".into()).unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v2".into()));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.external_changes().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();

        assert_eq!(store.get("AllLocals").unwrap(), None);
        store.set("AllLocals", "[]".into()).unwrap();
        assert_eq!(store.get("AllLocals").unwrap(), Some("[]".into()));
        assert!(store.dir().join("AllLocals.json").exists());
        assert!(!store.dir().join("AllLocals.json.tmp").exists());

        store.remove("AllLocals").unwrap();
        store.remove("AllLocals").unwrap();
        assert_eq!(store.get("AllLocals").unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::open(dir.path())
            .unwrap()
            .set("jar", "blob".into())
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("jar").unwrap(), Some("blob".into()));
    }

    #[test]
    fn test_file_store_rejects_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        for key in ["", ".", "..", "../escape", "a/b", "a\\b"] {
            assert!(
                matches!(store.set(key, "x".into()), Err(Error::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
