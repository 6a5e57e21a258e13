//! Storage Module
//!
//! Everything below the notification layer: where blobs live, how "now" is
//! decided, and the entry store that ties them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EntryStore                           │
//! │   write / read / delete / list / clear / subscribe          │
//! │                                                             │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐    │
//! │   │ RecordCodec  │   │    Clock     │   │   Notifier   │    │
//! │   │ (one blob)   │   │ + is_valid   │   │  (local ch.) │    │
//! │   └──────┬───────┘   └──────────────┘   └──────────────┘    │
//! └──────────┼──────────────────────────────────────────────────┘
//!            ▼
//!   ┌─────────────────────────────────────────────┐
//!   │ dyn ByteStore: MemoryStore | FileStore |    │
//!   │                ContextStore (on an Origin)  │
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use cookiekv::storage::{EntryStore, Origin};
//! use std::sync::Arc;
//!
//! // Two contexts sharing one origin
//! let origin = Origin::in_memory();
//! let tab_a = EntryStore::new(Arc::new(origin.context()));
//! let tab_b = EntryStore::new(Arc::new(origin.context()));
//!
//! tab_a.write("user", "ariz");
//! assert_eq!(tab_b.read("user").as_deref(), Some("ariz"));
//! ```

pub mod backend;
pub mod engine;
pub mod expiry;
pub mod origin;

// Re-export commonly used types
pub use backend::{ByteStore, FileStore, MemoryStore};
pub use engine::{EntryStore, ListedEntry, StoreStats};
pub use expiry::{is_valid, Clock, ManualClock, SystemClock};
pub use origin::{ContextId, ContextStore, Origin, StorageEvent, StorageEvents};
