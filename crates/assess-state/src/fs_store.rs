use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{validate_key, BlobStore, StorageResult};

/// Filesystem-backed blob store.
///
/// Layout: `<root>/<key>.json`
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a new `FsBlobStore` rooted at `root`. Creates `root` if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let root = self.root.clone();
        let path = self.blob_path(key);
        let data = data.to_vec();
        let owned_key = key.to_string();

        // Atomic write: write to temp file in the same directory, then rename.
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io {
            key: owned_key.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;

        written.map_err(|source| StorageError::Io {
            key: owned_key.clone(),
            source,
        })?;
        debug!(key = %owned_key, "blob written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
