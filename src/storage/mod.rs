pub mod local;

pub use local::LocalDisk;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

/// Subdirectory of the public disk that holds story images.
pub const STORIES_DIRECTORY: &str = "stories";

/// URL prefix under which the public disk root is served.
pub const PUBLIC_PREFIX: &str = "storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// File storage disk holding uploaded story images.
#[async_trait]
pub trait Disk: Send + Sync {
    /// Store `data` under `directory` with a generated file name; returns the relative path.
    async fn store(&self, directory: &str, data: Bytes, extension: &str) -> Result<String, StorageError>;

    /// Remove the file at `path`. Returns false when nothing was there.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}
