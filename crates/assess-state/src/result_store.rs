//! Append-only result log on top of a [`BlobStore`].
//!
//! The whole log lives under [`RESULTS_KEY`] as one JSON array. Appends and
//! clears are read-modify-write operations, serialized through a single
//! async mutex so a clear can never interleave with an in-flight append.
//! Reads take no lock; the blob store's atomic `put` guarantees they see a
//! complete log.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::StorageError;
use crate::schema::AssessmentResult;
use crate::storage_traits::{BlobStore, StorageResult, RESULTS_KEY};

/// Ordered, durable log of completed assessment results.
#[derive(Clone)]
pub struct ResultStore {
    blobs: Arc<dyn BlobStore>,
    write_lock: Arc<Mutex<()>>,
}

impl ResultStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read every stored result, oldest first.
    pub async fn read_all(&self) -> StorageResult<Vec<AssessmentResult>> {
        match self.blobs.get(RESULTS_KEY).await? {
            None => Ok(Vec::new()),
            Some(bytes) => decode_log(&bytes),
        }
    }

    /// Results for one test, oldest first.
    pub async fn read_for_test(&self, test_id: &str) -> StorageResult<Vec<AssessmentResult>> {
        let mut all = self.read_all().await?;
        all.retain(|r| r.test_id == test_id);
        Ok(all)
    }

    /// Append one result to the end of the log.
    #[instrument(skip(self, result), fields(test_id = %result.test_id))]
    pub async fn append(&self, result: &AssessmentResult) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut log = self.read_all().await?;
        log.push(result.clone());
        let bytes = serde_json::to_vec(&log).map_err(|e| StorageError::Serialization {
            key: RESULTS_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.blobs.put(RESULTS_KEY, &bytes).await?;
        debug!(entries = log.len(), "result appended");
        Ok(())
    }

    /// Remove every stored result.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.blobs.remove(RESULTS_KEY).await?;
        debug!("result log cleared");
        Ok(())
    }
}

fn decode_log(bytes: &[u8]) -> StorageResult<Vec<AssessmentResult>> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
        key: RESULTS_KEY.to_string(),
        reason: e.to_string(),
    })
}
