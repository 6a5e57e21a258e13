//! Record Codec
//!
//! Turns the whole collection into one JSON blob and back. The blob lives
//! under a single key of a [`ByteStore`] and is always replaced in full.
//!
//! ```text
//!   ByteStore["AllLocals"]  ──decode──▶  Collection [Entry, Entry, ...]
//!                           ◀──encode──
//! ```
//!
//! Loading never fails: a missing blob, an unparsable blob, or a backend
//! error all read as an empty collection.

pub mod record;

pub use record::Entry;

use crate::error::Result;
use crate::storage::ByteStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, trace, warn};

/// The ordered set of entries persisted as one unit.
///
/// Replacing an entry keeps its position; new entries are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    entries: Vec<Entry>,
}

impl Collection {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Returns the first entry with this name.
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Replaces the first entry with the same name in place, or appends.
    ///
    /// Returns `true` if an existing entry was replaced.
    pub fn upsert(&mut self, entry: Entry) -> bool {
        match self.entries.iter().position(|e| e.name == entry.name) {
            Some(index) => {
                self.entries[index] = entry;
                true
            }
            None => {
                self.entries.push(entry);
                false
            }
        }
    }

    /// Removes every entry with this name and returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        before - self.entries.len()
    }

    /// Parses a stored blob. Blank input is an empty collection.
    ///
    /// Only a blob that is not a JSON array fails. Records inside the array
    /// are decoded one at a time and a malformed one is dropped with a
    /// warning, so the next save removes it while the rest survive.
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }

        let records: Vec<Value> = serde_json::from_str(raw)?;
        let entries = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Entry>(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(index = index, error = %e, "Dropping malformed record");
                    None
                }
            })
            .collect();
        Ok(Self { entries })
    }

    /// Serializes the collection to its stored form.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Vec<Entry>> for Collection {
    fn from(entries: Vec<Entry>) -> Self {
        Self { entries }
    }
}

impl IntoIterator for Collection {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Loads and saves the collection under one fixed key.
#[derive(Clone)]
pub struct RecordCodec {
    backend: Arc<dyn ByteStore>,
    key: String,
}

impl std::fmt::Debug for RecordCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCodec").field("key", &self.key).finish()
    }
}

impl RecordCodec {
    pub fn new(backend: Arc<dyn ByteStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// The storage key this codec reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &Arc<dyn ByteStore> {
        &self.backend
    }

    /// Reads the collection, treating anything unreadable as empty.
    pub fn load(&self) -> Collection {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Collection::new(),
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to read collection blob");
                return Collection::new();
            }
        };

        match Collection::decode(&raw) {
            Ok(collection) => {
                trace!(key = %self.key, entries = collection.len(), "Loaded collection");
                collection
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unparsable collection blob");
                Collection::new()
            }
        }
    }

    /// Replaces the stored blob with `collection`.
    ///
    /// Returns `false` (after logging) if the blob could not be written.
    pub fn save(&self, collection: &Collection) -> bool {
        let result = collection
            .encode()
            .and_then(|raw| self.backend.set(&self.key, raw));

        match result {
            Ok(()) => {
                trace!(key = %self.key, entries = collection.len(), "Saved collection");
                true
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to save collection blob");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn entry(name: &str, value: &str) -> Entry {
        Entry::new(name, value, 60, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    fn codec() -> (Arc<MemoryStore>, RecordCodec) {
        let store = Arc::new(MemoryStore::new());
        let codec = RecordCodec::new(store.clone(), "AllLocals");
        (store, codec)
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut collection = Collection::new();
        assert!(!collection.upsert(entry("a", "1")));
        assert!(!collection.upsert(entry("b", "2")));
        assert!(collection.upsert(entry("a", "3")));

        let names: Vec<_> = collection.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(collection.find("a").unwrap().value, "3");
    }

    #[test]
    fn test_remove_drops_all_matches() {
        let mut collection = Collection::from(vec![entry("a", "1"), entry("b", "2"), entry("a", "3")]);
        assert_eq!(collection.remove("a"), 2);
        assert_eq!(collection.remove("missing"), 0);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_load_missing_blob_is_empty() {
        let (_, codec) = codec();
        assert!(codec.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_blob_is_empty() {
        let (store, codec) = codec();

        for raw in ["not json", "{\"loc_name\":1}", "null", "   "] {
            store.set("AllLocals", raw.to_string()).unwrap();
            assert!(codec.load().is_empty(), "blob {raw:?} should load as empty");
        }
    }

    #[test]
    fn test_save_then_load() {
        let (store, codec) = codec();
        let collection = Collection::from(vec![entry("a", "1"), entry("b", "2")]);

        assert!(codec.save(&collection));
        assert_eq!(codec.load(), collection);

        let raw = store.get("AllLocals").unwrap().unwrap();
        assert!(raw.starts_with("[{\"loc_name\":\"a\""));
    }

    #[test]
    fn test_load_blob_written_elsewhere() {
        let (store, codec) = codec();
        store
            .set(
                "AllLocals",
                r#"[{"loc_name":"token","loc_value":"abc","loc_time":60,"loc_created_date":"2023-11-14T22:13:20.000Z"}]"#
                    .to_string(),
            )
            .unwrap();

        let loaded = codec.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.find("token"), Some(&entry("token", "abc")));
    }

    #[test]
    fn test_malformed_record_does_not_sink_the_rest() {
        let (store, codec) = codec();
        store
            .set(
                "AllLocals",
                r#"[{"loc_name":"token","loc_value":"abc","loc_time":60,"loc_created_date":"2023-11-14T22:13:20.000Z"},
                    {"loc_name":"legacy","loc_value":"x","loc_time":60},
                    {"loc_name":"stamp","loc_value":"y","loc_time":60,"loc_created_date":"yesterday"},
                    42]"#
                    .to_string(),
            )
            .unwrap();

        let loaded = codec.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.find("token"), Some(&entry("token", "abc")));

        // Saving back keeps the good record and drops the broken ones
        assert!(codec.save(&loaded));
        let raw = store.get("AllLocals").unwrap().unwrap();
        assert!(raw.contains("token"));
        assert!(!raw.contains("legacy"));
    }
}
