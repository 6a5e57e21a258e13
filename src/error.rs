//! Error types for cookiekv.
//!
//! None of these ever reach the caller of an [`EntryStore`](crate::EntryStore)
//! operation: the store logs them and degrades to a no-op or an empty result.
//! They are public because [`ByteStore`](crate::storage::ByteStore)
//! implementations outside this crate need to produce them.

/// Errors produced by byte stores, the record codec and input validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write or delete was attempted with an empty entry name
    #[error("entry name must not be empty")]
    EmptyName,

    /// A write was attempted with an empty value
    #[error("entry value must not be empty")]
    EmptyValue,

    /// The byte store cannot hold a blob under this key
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// I/O error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The collection could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Checks the name/value preconditions shared by `write`.
pub(crate) fn validate_entry(name: &str, value: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::EmptyName);
    }
    if value.is_empty() {
        return Err(Error::EmptyValue);
    }
    Ok(())
}
