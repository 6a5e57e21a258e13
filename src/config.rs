use crate::{DEFAULT_STORAGE_KEY, DEFAULT_TTL_SECS};

/// Default capacity of the same-context notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for an [`EntryStore`](crate::EntryStore).
///
/// # Example
///
/// ```rust
/// use cookiekv::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_storage_key("session-cookies")
///     .with_default_ttl(300);
/// assert_eq!(config.default_ttl_secs, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key under which the whole collection is persisted (default: `AllLocals`)
    pub storage_key: String,

    /// TTL applied by [`EntryStore::write`](crate::EntryStore::write) (default: 60 seconds)
    pub default_ttl_secs: i64,

    /// Buffer size of the same-context notification channel.
    /// A slow observer that falls further behind sees one coalesced wake-up.
    pub channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_ttl_secs: DEFAULT_TTL_SECS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key the collection is stored under
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the TTL used when a write does not give one.
    ///
    /// Not validated: zero or negative values make every default write
    /// expire immediately.
    pub fn with_default_ttl(mut self, secs: i64) -> Self {
        self.default_ttl_secs = secs;
        self
    }

    /// Sets the notification channel capacity (clamped to at least 1)
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}
