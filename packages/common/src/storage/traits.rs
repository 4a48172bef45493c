use std::io::Cursor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// An open blob, ready to be streamed to a client.
pub struct BlobObject {
    pub reader: BoxReader,
    pub size: u64,
    pub content_type: String,
    /// `Cache-Control` value the backend wants served alongside the bytes.
    pub cache_control: Option<String>,
}

/// Listing entry returned by [`BlobStore::enumerate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Key-addressed blob storage.
///
/// Implementations are shared across request tasks as `Arc<dyn BlobStore>`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous blob with that key.
    async fn put(&self, key: &str, data: &[u8]) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write(key, reader).await
    }

    /// Stream `reader` into the blob named `key` and return the number of bytes written.
    ///
    /// A partially written blob is never visible under `key`.
    async fn write(&self, key: &str, reader: BoxReader) -> Result<u64, StorageError>;

    /// Open a blob for streaming.
    async fn stream(&self, key: &str) -> Result<BlobObject, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut blob = self.stream(key).await?;
        let mut buf = Vec::new();
        blob.reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Check whether a blob exists. `false` only means definite absence.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// List every blob whose key starts with `prefix`.
    async fn enumerate(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError>;

    /// Release backend resources. Called once during shutdown.
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
