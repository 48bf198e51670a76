//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryBlobStore`, which satisfies the `BlobStore` contract
//! without touching the filesystem and can be told to reject writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory blob store backed by a `HashMap<key, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    reject_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key with raw bytes (e.g. a hand-written profile).
    pub fn with_blob(self, key: &str, data: impl Into<Vec<u8>>) -> Self {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), data.into());
        self
    }

    /// Make every subsequent `put`/`remove` fail with `WriteRejected`.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of successful `put` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, key: &str) -> StorageResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected {
                key: key.to_string(),
                reason: "store is read-only".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs.get(key).cloned())
    }

    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable(key)?;
        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert(key.to_string(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable(key)?;
        let mut blobs = self.blobs.lock().unwrap();
        blobs.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reject_writes_toggle() {
        let store = MemoryBlobStore::new();
        store.put("k", b"1").await.unwrap();

        store.set_reject_writes(true);
        let err = store.put("k", b"2").await.unwrap_err();
        assert!(matches!(err, StorageError::WriteRejected { .. }));
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"1");

        store.set_reject_writes(false);
        store.put("k", b"3").await.unwrap();
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_with_blob_seeds_value() {
        let store = MemoryBlobStore::new().with_blob(PROFILE_KEY, r#"{"name":"Alex"}"#);
        assert!(store.get(PROFILE_KEY).await.unwrap().is_some());
    }
}
