//! Storage trait definitions
//!
//! `BlobStore` is the single durable primitive: whole-value reads and
//! writes of opaque bytes under a string key. Higher-level stores
//! (`ResultStore`, profile loading) layer JSON records on top of it.
//!
//! The trait is async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Key holding the JSON array of completed results.
pub const RESULTS_KEY: &str = "testResults";

/// Key holding the athlete profile JSON object.
pub const PROFILE_KEY: &str = "athleteProfile";

/// Durable keyed blob storage.
///
/// Guarantees:
/// - `put(key, data)` replaces the whole value atomically: a concurrent
///   `get` sees either the previous value or `data`, never a mix.
/// - `get` of a key that was never written (or was removed) is `Ok(None)`.
/// - `remove` of an absent key is a no-op.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the full value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Delete the value stored under `key`.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Keys become file names, so restrict them to a portable alphabet.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key(RESULTS_KEY).is_ok());
        assert!(validate_key(PROFILE_KEY).is_ok());
        assert!(validate_key("results-v2_backup").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
    }
}
