use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageError;
use super::traits::{BlobInfo, BlobObject, BlobStore, BoxReader};

/// Run `fut`, failing with [`StorageError::Timeout`] once `limit` elapses.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StorageError::Timeout(limit))?
}

/// Wraps another store so that every operation is bounded by the same deadline.
///
/// For [`BlobStore::stream`] the deadline covers opening the blob, not draining it.
pub struct DeadlineBlobStore {
    inner: Arc<dyn BlobStore>,
    limit: Duration,
}

impl DeadlineBlobStore {
    pub fn new(inner: Arc<dyn BlobStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl BlobStore for DeadlineBlobStore {
    async fn write(&self, key: &str, reader: BoxReader) -> Result<u64, StorageError> {
        with_deadline(self.limit, self.inner.write(key, reader)).await
    }

    async fn stream(&self, key: &str) -> Result<BlobObject, StorageError> {
        with_deadline(self.limit, self.inner.stream(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        with_deadline(self.limit, self.inner.exists(key)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        with_deadline(self.limit, self.inner.delete(key)).await
    }

    async fn enumerate(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError> {
        with_deadline(self.limit, self.inner.enumerate(prefix)).await
    }

    async fn close(&self) -> Result<(), StorageError> {
        with_deadline(self.limit, self.inner.close()).await
    }
}
