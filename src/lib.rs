//! # cookiekv - Cookie-Like Values With TTL, Stored As One Blob
//!
//! cookiekv keeps named string values that expire a fixed number of seconds
//! after they were written. The whole collection is serialized into a
//! single blob under a single key of a pluggable byte store, and every change
//! is announced so that independent observers, in this context or in other
//! contexts sharing the same storage, can re-read what they display.
//!
//! ## Features
//!
//! - **Per-entry TTL**: each write carries its own lifetime (default 60s)
//! - **Lazy expiry**: expired entries are purged by the read that finds them
//! - **One blob**: the collection is a JSON array, replaced whole on save
//! - **Change notification**: payload-free same-context and cross-context channels
//! - **Observers**: `subscribe(name)` keeps a value current via a Tokio task
//!
//! ## Architecture
//!
//! ```text
//!  caller ──▶ EntryStore ──▶ RecordCodec::load ──▶ is_valid ──▶ mutate
//!                                                                  │
//!      ┌───────────────────────────────────────────────────────────┘
//!      ▼
//!  RecordCodec::save ──▶ Notifier::notify_local ──▶ Subscription(s) re-read ──▶ UI
//!                                                        ▲
//!  other context ──▶ ContextStore::set ──▶ StorageEvent ─┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use cookiekv::EntryStore;
//!
//! let store = EntryStore::in_memory();
//!
//! store.write("theme", "dark");              // default TTL
//! store.write_with_ttl("otp", "1234", 30);   // 30 seconds
//!
//! assert_eq!(store.read("theme").as_deref(), Some("dark"));
//! assert_eq!(store.list().len(), 2);
//!
//! store.clear();
//! assert!(store.list().is_empty());
//! ```
//!
//! ## Module Overview
//!
//! - [`codec`]: persisted record shape and collection encode/decode
//! - [`storage`]: byte stores, shared origins, expiry and the entry store
//! - [`notify`]: same-context and cross-context change channels
//! - [`observer`]: subscriptions and the mount/unmount value observer
//!
//! ## Error Policy
//!
//! No store operation returns an error. Invalid input is reported through
//! `tracing` and ignored, and an unreadable blob reads as an empty
//! collection. [`Error`] exists for [`storage::ByteStore`] implementations.

pub mod codec;
pub mod config;
pub mod error;
pub mod notify;
pub mod observer;
pub mod storage;

// Re-export commonly used types for convenience
pub use codec::{Collection, Entry, RecordCodec};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use notify::{Channel, ChangeStream, Notifier};
pub use observer::{ObserverState, Subscription, ValueObserver};
pub use storage::{
    ByteStore, EntryStore, FileStore, ListedEntry, MemoryStore, Origin, StoreStats,
};

/// Key the collection is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "AllLocals";

/// TTL applied when a write does not give one
pub const DEFAULT_TTL_SECS: i64 = 60;

/// Version of cookiekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
