use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use super::{Disk, StorageError};

/// Public disk backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative disk path, refusing anything that would leave the root.
    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Disk for LocalDisk {
    async fn store(&self, directory: &str, data: Bytes, extension: &str) -> Result<String, StorageError> {
        let path = format!("{}/{}.{}", directory, Uuid::new_v4().simple(), extension);
        let full_path = self.full_path(&path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        if let Err(e) = write_contents(&mut file, &data).await {
            drop(file);
            remove_partial(&full_path).await;
            return Err(e.into());
        }

        tracing::debug!("Stored {} bytes at {:?}", data.len(), full_path);
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.full_path(path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", full_path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_contents<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> std::io::Result<()> {
    writer.write_all(data).await?;
    writer.flush().await
}

/// A failed write must not leave a truncated file behind.
async fn remove_partial(full_path: &Path) {
    if let Err(e) = fs::remove_file(full_path).await {
        tracing::warn!("Failed to remove partially written file {:?}: {}", full_path, e);
    }
}
