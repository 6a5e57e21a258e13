//! Shared origin storage
//!
//! An [`Origin`] is one byte store shared by several independent execution
//! contexts (tabs, windows, components with their own store instance). Each
//! context gets a [`ContextStore`] handle. When a context changes a blob,
//! every *other* context receives a storage event; the writer itself never
//! sees its own change on this channel.
//!
//! ```text
//!           ┌──────────────── Origin ────────────────┐
//!           │  Arc<dyn ByteStore>   broadcast<event> │
//!           └───────▲──────────────────────┬─────────┘
//!                   │ set/remove           │ events from others
//!        ┌──────────┴───┐           ┌──────▼───────┐
//!        │ ContextStore │           │ ContextStore │
//!        │    id = 1    │           │    id = 2    │
//!        └──────────────┘           └──────────────┘
//! ```
//!
//! Events are only published when the stored blob actually changes.

use crate::config::DEFAULT_CHANNEL_CAPACITY;
use crate::error::Result;
use crate::storage::backend::{ByteStore, MemoryStore};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::trace;

/// Identifies one context within an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// A change made by another context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    /// The blob under `key` was written or removed
    Changed { key: String },

    /// The receiver fell behind and this many events were dropped.
    /// Treat it as "something changed".
    Lagged(u64),
}

#[derive(Debug, Clone)]
struct RawEvent {
    key: String,
    source: ContextId,
}

struct OriginInner {
    backend: Arc<dyn ByteStore>,
    events: broadcast::Sender<RawEvent>,
    next_id: AtomicU64,
}

/// One byte store shared by many contexts.
#[derive(Clone)]
pub struct Origin {
    inner: Arc<OriginInner>,
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("contexts", &self.inner.next_id.load(Ordering::Relaxed))
            .field("listeners", &self.inner.events.receiver_count())
            .finish()
    }
}

impl Origin {
    /// Wraps `backend` as shared origin storage.
    pub fn new(backend: Arc<dyn ByteStore>) -> Self {
        Self::with_capacity(backend, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Like [`Origin::new`] with a custom event buffer size.
    pub fn with_capacity(backend: Arc<dyn ByteStore>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(OriginInner {
                backend,
                events,
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// An origin backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Opens a new context onto this origin.
    pub fn context(&self) -> ContextStore {
        let id = ContextId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        trace!(context = %id, "Opened storage context");
        ContextStore {
            id,
            origin: self.clone(),
        }
    }
}

/// One context's view of an [`Origin`].
#[derive(Clone)]
pub struct ContextStore {
    id: ContextId,
    origin: Origin,
}

impl fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStore").field("id", &self.id).finish()
    }
}

impl ContextStore {
    pub fn id(&self) -> ContextId {
        self.id
    }

    fn publish(&self, key: &str) {
        // No receivers is fine: nobody else is listening yet.
        let _ = self.origin.inner.events.send(RawEvent {
            key: key.to_string(),
            source: self.id,
        });
        trace!(context = %self.id, key = key, "Published storage event");
    }
}

impl ByteStore for ContextStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.origin.inner.backend.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let backend = &self.origin.inner.backend;
        let changed = backend.get(key)?.as_deref() != Some(value.as_str());
        backend.set(key, value)?;
        if changed {
            self.publish(key);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let backend = &self.origin.inner.backend;
        let existed = backend.get(key)?.is_some();
        backend.remove(key)?;
        if existed {
            self.publish(key);
        }
        Ok(())
    }

    fn external_changes(&self) -> Option<StorageEvents> {
        Some(StorageEvents {
            context: self.id,
            rx: self.origin.inner.events.subscribe(),
        })
    }
}

/// Storage events from every context except the subscriber's own.
#[derive(Debug)]
pub struct StorageEvents {
    context: ContextId,
    rx: broadcast::Receiver<RawEvent>,
}

impl StorageEvents {
    /// Waits for the next foreign change. `None` once the origin is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.source == self.context => continue,
                Ok(event) => return Some(StorageEvent::Changed { key: event.key }),
                Err(RecvError::Lagged(missed)) => return Some(StorageEvent::Lagged(missed)),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a pending foreign change without waiting.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.source == self.context => continue,
                Ok(event) => return Some(StorageEvent::Changed { key: event.key }),
                Err(TryRecvError::Lagged(missed)) => return Some(StorageEvent::Lagged(missed)),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
