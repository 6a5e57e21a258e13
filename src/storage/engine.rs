//! Entry Store
//!
//! The record-management engine. Every operation is a synchronous
//! load → modify → save cycle over the whole collection, followed by one
//! local change notification when something may have changed.
//!
//! ## Operation Flow
//!
//! ```text
//! write/delete/clear ──▶ RecordCodec::load ──▶ mutate ──▶ RecordCodec::save ──▶ notify_local
//!
//! read ──▶ RecordCodec::load ──▶ find ──▶ is_valid? ──yes──▶ Some(value)
//!                                             │
//!                                             no ──▶ delete(name) ──▶ None
//! ```
//!
//! ## Contracts
//!
//! - **Reads may write.** A read that finds an expired entry deletes it, which
//!   saves the collection and fires a notification. `list` reads every entry
//!   and therefore purges every expired one it meets.
//! - **Nothing propagates.** Invalid input is logged and ignored; a corrupt or
//!   unreadable blob reads as empty; a failed save is logged.
//! - **One cycle at a time.** Clones of a store share one lock, so their
//!   load → save cycles never interleave. Across contexts the last write wins.
//!
//! ## Example
//!
//! ```
//! use cookiekv::EntryStore;
//!
//! let store = EntryStore::in_memory();
//! store.write_with_ttl("theme", "dark", 3600);
//! assert_eq!(store.read("theme").as_deref(), Some("dark"));
//!
//! store.delete("theme");
//! assert_eq!(store.read("theme"), None);
//! ```

use crate::codec::{Collection, Entry, RecordCodec};
use crate::config::StoreConfig;
use crate::error::{validate_entry, Error};
use crate::notify::{ChangeStream, Notifier};
use crate::observer::Subscription;
use crate::storage::backend::{ByteStore, MemoryStore};
use crate::storage::expiry::{self, Clock, SystemClock};
use chrono::TimeDelta;
use serde::Serialize;
use std::fmt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// A live entry as reported by [`EntryStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEntry {
    pub name: String,
    pub value: String,
    pub ttl_seconds: i64,
}

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Writes whose collection was saved
    pub writes: u64,
    /// Reads that reached the backend
    pub reads: u64,
    /// Delete calls, including self-purges
    pub deletes: u64,
    /// Clear calls
    pub clears: u64,
    /// Entries removed because a read found them expired
    pub purged: u64,
    /// Calls ignored because of invalid input
    pub rejected: u64,
    /// Local change notifications fired
    pub notifications: u64,
}

#[derive(Debug, Default)]
struct Counters {
    writes: AtomicU64,
    reads: AtomicU64,
    deletes: AtomicU64,
    clears: AtomicU64,
    purged: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct StoreInner {
    codec: RecordCodec,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    config: StoreConfig,
    counters: Counters,
    /// Held across every load → save cycle
    cycle: Mutex<()>,
}

/// Cookie-like named values with per-entry TTL, persisted as one blob.
///
/// Cloning is cheap and every clone shares the same backend, clock and
/// notifier, so a clone handed to an observer sees the same notifications.
#[derive(Clone)]
pub struct EntryStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore")
            .field("key", &self.inner.codec.key())
            .field("notifier", &self.inner.notifier)
            .finish()
    }
}

impl EntryStore {
    /// Creates a store over `backend` with default settings and the system clock.
    pub fn new(backend: Arc<dyn ByteStore>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn ByteStore>, config: StoreConfig) -> Self {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Creates a store that takes "now" from `clock`.
    pub fn with_clock(backend: Arc<dyn ByteStore>, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let codec = RecordCodec::new(backend, config.storage_key.clone());
        let notifier = Notifier::new(config.channel_capacity);
        Self {
            inner: Arc::new(StoreInner {
                codec,
                clock,
                notifier,
                config,
                counters: Counters::default(),
                cycle: Mutex::new(()),
            }),
        }
    }

    /// A store over a private [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Writes `value` under `name` with the configured default TTL.
    pub fn write(&self, name: &str, value: &str) {
        self.write_with_ttl(name, value, self.inner.config.default_ttl_secs);
    }

    /// Writes `value` under `name`, valid for `ttl_seconds` from now.
    ///
    /// An existing entry with the same name is replaced in place; otherwise
    /// the entry is appended. Empty names or values are logged and ignored.
    /// The TTL is not validated: zero or negative means already expired.
    pub fn write_with_ttl(&self, name: &str, value: &str, ttl_seconds: i64) {
        if let Err(e) = validate_entry(name, value) {
            self.reject("write", name, &e);
            return;
        }

        let (saved, replaced) = {
            let _cycle = self.inner.cycle.lock();
            let created_at = expiry::creation_stamp(self.inner.clock.now());
            let mut collection = self.inner.codec.load();
            let replaced = collection.upsert(Entry::new(name, value, ttl_seconds, created_at));
            (self.inner.codec.save(&collection), replaced)
        };

        if saved {
            Counters::bump(&self.inner.counters.writes);
        }
        debug!(name = name, ttl_seconds = ttl_seconds, replaced = replaced, saved = saved, "Wrote entry");
        self.inner.notifier.notify_local();
    }

    /// Returns the value under `name` if it exists and has not expired.
    ///
    /// Finding an expired entry deletes it (saving the collection and firing
    /// a notification) before returning `None`.
    pub fn read(&self, name: &str) -> Option<String> {
        self.entry(name).map(|entry| entry.value)
    }

    /// Like [`read`](Self::read) but returns the whole record.
    pub fn entry(&self, name: &str) -> Option<Entry> {
        if name.is_empty() {
            self.reject("read", name, &Error::EmptyName);
            return None;
        }

        Counters::bump(&self.inner.counters.reads);
        {
            let _cycle = self.inner.cycle.lock();
            let mut collection = self.inner.codec.load();
            let entry = collection.find(name)?;

            if expiry::is_valid(entry, self.inner.clock.now()) {
                trace!(name = name, "Read entry");
                return Some(entry.clone());
            }

            debug!(name = name, created_at = %entry.created_at, ttl_seconds = entry.ttl_seconds, "Entry expired, purging");
            Counters::bump(&self.inner.counters.purged);
            self.remove_locked(&mut collection, name);
        }
        self.inner.notifier.notify_local();
        None
    }

    /// Time left before `name` expires. Purges it if it already has.
    pub fn remaining(&self, name: &str) -> Option<TimeDelta> {
        let entry = self.entry(name)?;
        expiry::remaining(&entry, self.inner.clock.now())
    }

    /// Removes every entry named `name`.
    ///
    /// Always saves and always notifies, even when nothing matched.
    pub fn delete(&self, name: &str) {
        if name.is_empty() {
            self.reject("delete", name, &Error::EmptyName);
            return;
        }

        {
            let _cycle = self.inner.cycle.lock();
            let mut collection = self.inner.codec.load();
            self.remove_locked(&mut collection, name);
        }
        self.inner.notifier.notify_local();
    }

    /// Removes `name` from an already loaded collection and saves it.
    /// The caller holds the cycle lock and fires the notification.
    fn remove_locked(&self, collection: &mut Collection, name: &str) {
        let removed = collection.remove(name);
        self.inner.codec.save(collection);

        Counters::bump(&self.inner.counters.deletes);
        debug!(name = name, removed = removed, "Deleted entry");
    }

    /// Returns all unexpired entries in collection order.
    ///
    /// Each entry goes through [`read`](Self::read), so expired entries are
    /// purged along the way.
    pub fn list(&self) -> Vec<ListedEntry> {
        let snapshot = self.inner.codec.load();
        snapshot
            .into_iter()
            .filter(|entry| self.read(&entry.name).is_some())
            .map(|entry| ListedEntry {
                name: entry.name,
                value: entry.value,
                ttl_seconds: entry.ttl_seconds,
            })
            .collect()
    }

    /// Replaces the collection with an empty one.
    pub fn clear(&self) {
        {
            let _cycle = self.inner.cycle.lock();
            self.inner.codec.save(&Collection::new());
        }
        Counters::bump(&self.inner.counters.clears);
        debug!(key = %self.inner.codec.key(), "Cleared all entries");
        self.inner.notifier.notify_local();
    }

    /// The persisted collection as-is, expired entries included. Never purges.
    pub fn snapshot(&self) -> Collection {
        let _cycle = self.inner.cycle.lock();
        self.inner.codec.load()
    }

    /// A wake-up stream over the local channel and, when the backend
    /// provides them, storage events from other contexts.
    pub fn changes(&self) -> ChangeStream {
        let external = self.inner.codec.backend().external_changes();
        self.inner.notifier.subscribe(external)
    }

    /// Observes `name`: reads it now and again after every notification.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self, name: &str) -> Subscription {
        Subscription::start(self.clone(), name)
    }

    pub fn stats(&self) -> StoreStats {
        let c = &self.inner.counters;
        StoreStats {
            writes: c.writes.load(Ordering::Relaxed),
            reads: c.reads.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            clears: c.clears.load(Ordering::Relaxed),
            purged: c.purged.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            notifications: self.inner.notifier.sent(),
        }
    }

    fn reject(&self, operation: &'static str, name: &str, reason: &Error) {
        Counters::bump(&self.inner.counters.rejected);
        error!(operation = operation, name = name, error = %reason, "Rejected invalid input");
    }
}
