//! Error types for assess-state

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying filesystem failure
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded before writing
    #[error("serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// A stored blob exists but does not decode as the expected record
    #[error("stored data under key {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    /// Key is not usable as a storage name
    #[error("invalid storage key: {key:?}")]
    InvalidKey { key: String },

    /// Backend refused the write (used by fakes to simulate a full disk)
    #[error("write rejected for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },
}

impl StorageError {
    /// The key the failing operation targeted.
    pub fn key(&self) -> &str {
        match self {
            StorageError::Io { key, .. }
            | StorageError::Serialization { key, .. }
            | StorageError::Corrupt { key, .. }
            | StorageError::InvalidKey { key }
            | StorageError::WriteRejected { key, .. } => key,
        }
    }
}
