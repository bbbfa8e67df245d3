use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

/// A single bucket of objects addressed by key.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get raw object data. Missing objects yield `StorageError::NotFound`.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn object_exists(&self, key: &str) -> Result<bool, StorageError>;
    /// Write object bytes, overwriting any existing object under the same key.
    async fn write_object(&self, key: &str, data: &[u8], content_type: &str)
        -> Result<(), StorageError>;
    async fn tag_object(&self, key: &str, tags: &[(&str, &str)]) -> Result<(), StorageError>;
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
    fn public_url(&self, key: &str) -> String;

    /// Write and tag an object. An object whose tagging fails is deleted
    /// again, so a stored object always carries its tags.
    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        tags: &[(&str, &str)],
    ) -> Result<(), StorageError> {
        self.write_object(key, data, content_type).await?;

        if tags.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.tag_object(key, tags).await {
            if let Err(cleanup) = self.delete_object(key).await {
                tracing::warn!("Failed to remove untagged object {}: {}", key, cleanup);
            }
            return Err(e);
        }

        Ok(())
    }
}
