use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::{StorageError, validate_key};
use super::traits::{BlobInfo, BlobObject, BlobStore, BoxReader};
use crate::sniff::{SNIFF_LEN, sniff};

const CACHE_CONTROL: &str = "public, max-age=86400";

/// Filesystem-backed blob store.
///
/// Blobs live flat under `{base_path}/{key}`. Writes are staged in
/// `{base_path}/.tmp` and renamed into place once complete.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store, creating the directories it needs.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn copy_to_temp(
        &self,
        reader: &mut BoxReader,
        temp_path: &Path,
    ) -> Result<u64, StorageError> {
        let mut temp_file = fs::File::create(temp_path).await?;
        let mut buf = vec![0u8; 64 * 1024];
        let mut total_bytes: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total_bytes += n as u64;
            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        temp_file.sync_all().await?;
        Ok(total_bytes)
    }
}

/// A file under `.tmp` that is removed on drop unless [`StagedFile::keep`] is called.
///
/// Covers the write future being dropped mid-copy (deadline, client disconnect),
/// which no `Err` branch would see.
struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// The file has been renamed away; nothing left to clean up.
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged file");
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn write(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        let blob_path = self.blob_path(key)?;
        let staged = StagedFile::new(self.temp_path());

        let written = self.copy_to_temp(&mut reader, &staged.path).await?;
        fs::rename(&staged.path, &blob_path).await?;
        staged.keep();

        Ok(written)
    }

    async fn stream(&self, key: &str) -> Result<BlobObject, StorageError> {
        let blob_path = self.blob_path(key)?;
        let mut file = match fs::File::open(&blob_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut file)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await?;
        let content_type = sniff(&head).to_string();

        let reader = std::io::Cursor::new(head).chain(BufReader::new(file));
        Ok(BlobObject {
            reader: Box::new(reader),
            size,
            content_type,
            cache_control: Some(CACHE_CONTROL.to_string()),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(key)?;
        Ok(fs::try_exists(&blob_path).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(key)?;
        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn enumerate(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut blobs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name == ".tmp" || !name.starts_with(prefix) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }

            blobs.push(BlobInfo {
                mime: mime_guess::from_path(&name)
                    .first_or_octet_stream()
                    .to_string(),
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                name,
            });
        }

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }
}
