//! Capture hardware seam.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reference to a recorded video on local storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoRef(PathBuf);

impl VideoRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for VideoRef {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for VideoRef {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&str> for VideoRef {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl std::fmt::Display for VideoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The device failed; the attempt cannot continue.
    #[error("capture hardware failure: {0}")]
    Hardware(String),
}

/// A camera (or stand-in) that records one video per attempt.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Start recording. The device must stop on its own after
    /// `max_duration` if `finish` is never called.
    async fn begin(&self, max_duration: Duration) -> Result<(), CaptureError>;

    /// Stop recording and return the video.
    async fn finish(&self) -> Result<VideoRef, CaptureError>;
}

/// Uses an already recorded file as the capture output.
#[derive(Debug, Clone)]
pub struct FileCaptureDevice {
    source: PathBuf,
}

impl FileCaptureDevice {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    async fn check_source(&self) -> Result<(), CaptureError> {
        let meta = tokio::fs::metadata(&self.source).await.map_err(|e| {
            CaptureError::Hardware(format!("{}: {e}", self.source.display()))
        })?;
        if !meta.is_file() {
            return Err(CaptureError::Hardware(format!(
                "{} is not a file",
                self.source.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CaptureDevice for FileCaptureDevice {
    async fn begin(&self, max_duration: Duration) -> Result<(), CaptureError> {
        self.check_source().await?;
        debug!(source = %self.source.display(), max_secs = max_duration.as_secs(), "capture started");
        Ok(())
    }

    async fn finish(&self) -> Result<VideoRef, CaptureError> {
        self.check_source().await?;
        Ok(VideoRef::new(self.source.clone()))
    }
}
