use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::BucketConfiguration;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use super::error::{StorageError, validate_key};
use super::traits::{BlobInfo, BlobObject, BlobStore, BoxReader};
use crate::sniff::{OCTET_STREAM, SNIFF_LEN, sniff};

const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Connection settings for an S3-compatible object store.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    /// Forwarded as `x-goog-project-id` when talking to GCS.
    pub project_id: Option<String>,
    /// Emulator or self-hosted endpoint. Enables path-style addressing.
    pub emulator_endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Blob store backed by an S3-compatible bucket (GCS interoperability, MinIO, emulators).
pub struct ObjectBlobStore {
    bucket: Box<Bucket>,
}

impl ObjectBlobStore {
    /// Connect to the bucket, creating it if it does not exist yet.
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::Backend("object store bucket is not configured".into()));
        }

        let region_name = config.region.clone().unwrap_or_else(|| "auto".to_string());
        let region = Region::Custom {
            region: region_name,
            endpoint: config
                .emulator_endpoint
                .clone()
                .unwrap_or_else(|| GCS_ENDPOINT.to_string()),
        };
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid object store credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(backend)?;
        if config.emulator_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }
        if let Some(project_id) = &config.project_id {
            bucket.add_header("x-goog-project-id", project_id);
        }

        match bucket.exists().await {
            Ok(true) => {}
            Ok(false) => {
                let created = if config.emulator_endpoint.is_some() {
                    Bucket::create_with_path_style(
                        &config.bucket,
                        region,
                        credentials,
                        BucketConfiguration::default(),
                    )
                    .await
                } else {
                    Bucket::create(
                        &config.bucket,
                        region,
                        credentials,
                        BucketConfiguration::default(),
                    )
                    .await
                };
                match created {
                    Ok(_) => info!(bucket = %config.bucket, "Created object store bucket"),
                    Err(e) => {
                        warn!(bucket = %config.bucket, error = %e, "Failed to create bucket")
                    }
                }
            }
            Err(e) => warn!(bucket = %config.bucket, error = %e, "Could not check bucket"),
        }

        Ok(Self { bucket })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

fn check_status(status: u16, key: &str) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for '{key}'"
        ))),
    }
}

/// Counts bytes as they are pulled by the uploader.
struct CountingReader<'a> {
    inner: &'a mut BoxReader,
    count: u64,
}

impl AsyncRead for CountingReader<'_> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut *self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            self.count += (buf.filled().len() - before) as u64;
        }
        poll
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn write(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        validate_key(key)?;

        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut reader)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await?;
        let content_type = sniff(&head);

        let mut replay: BoxReader = Box::new(std::io::Cursor::new(head).chain(reader));
        let mut counting = CountingReader {
            inner: &mut replay,
            count: 0,
        };

        let result = self
            .bucket
            .put_object_stream_with_content_type(&mut counting, key, content_type)
            .await
            .map_err(backend)
            .and_then(|resp| check_status(resp.status_code(), key));

        if let Err(e) = result {
            if let Err(cleanup) = self.bucket.delete_object(key).await {
                warn!(key, error = %cleanup, "Failed to remove partial object");
            }
            return Err(e);
        }

        Ok(counting.count)
    }

    async fn stream(&self, key: &str) -> Result<BlobObject, StorageError> {
        validate_key(key)?;

        let (head, status) = match self.bucket.head_object(key).await {
            Ok(res) => res,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) => return Err(backend(e)),
        };
        check_status(status, key)?;

        let response = self
            .bucket
            .get_object_stream(key)
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend(e)
                }
            })?;
        check_status(response.status_code, key)?;

        let bytes = response.bytes.map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(BlobObject {
            reader: Box::new(StreamReader::new(bytes)),
            size: head
                .content_length
                .and_then(|len| u64::try_from(len).ok())
                .unwrap_or_default(),
            content_type: head
                .content_type
                .unwrap_or_else(|| OCTET_STREAM.to_string()),
            cache_control: head.cache_control,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        match self.bucket.head_object(key).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) => check_status(status, key).map(|_| true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if !self.exists(key).await? {
            return Ok(false);
        }
        let response = self.bucket.delete_object(key).await.map_err(backend)?;
        match response.status_code() {
            404 => Ok(false),
            status => check_status(status, key).map(|_| true),
        }
    }

    async fn enumerate(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(backend)?;

        let mut blobs: Vec<BlobInfo> = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| BlobInfo {
                mime: mime_guess::from_path(&object.key)
                    .first_or_octet_stream()
                    .to_string(),
                size: object.size,
                modified: DateTime::parse_from_rfc3339(&object.last_modified)
                    .ok()
                    .map(|t| t.with_timezone(&Utc)),
                name: object.key,
            })
            .collect();

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }
}
