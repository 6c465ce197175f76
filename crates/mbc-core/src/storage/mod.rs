//! Pluggable key-value storage backing the session slot and the expiring cache.
//!
//! Both stores talk to a `Storage` implementation through serialized JSON
//! strings, so a test can swap the on-disk backend for `MemoryStorage`
//! without touching the store logic.
//!
//! - `MemoryStorage`: process-local map, shared between clones
//! - `FileStorage`: one `<key>.json` file per key inside a session directory

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Durable string slots addressed by key. Last write wins.
pub trait Storage: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace whatever is stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// List every key currently present.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Remove every key. Ends the storage scope.
    fn clear_all(&self) -> Result<(), StorageError> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}
