//! Read-only access to the stored athlete profile.

use crate::error::StorageError;
use crate::schema::AthleteProfile;
use crate::storage_traits::{BlobStore, StorageResult, PROFILE_KEY};

/// Load the athlete profile, or `None` if none has been saved yet.
pub async fn load_profile(blobs: &dyn BlobStore) -> StorageResult<Option<AthleteProfile>> {
    let Some(bytes) = blobs.get(PROFILE_KEY).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            key: PROFILE_KEY.to_string(),
            reason: e.to_string(),
        })
}
