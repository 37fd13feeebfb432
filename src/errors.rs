//! Error types for the key event log storage engine.

use thiserror::Error;

/// Hard failures surfaced by the storage engine.
///
/// Soft conditions — "already present", "absent" — are never represented
/// here; they are encoded directly in the `bool`/`Option`/empty-collection
/// return values of the keyspace and schema layers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("environment not opened")]
    NotOpened,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("environment error: {0}")]
    Env(#[from] heed::Error),

    #[error("key of {len} bytes exceeds max_key_size of {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("insertion-order ordinal at key would exceed capacity of {max}")]
    CapacityExceeded { max: u32 },

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage engine operations.
pub type Result<T> = std::result::Result<T, StoreError>;
