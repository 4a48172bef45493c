use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use common::sniff::OCTET_STREAM;
use common::storage::{BlobObject, BlobStore, BoxReader};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::ServiceError;
use crate::catalog::{Catalog, CatalogError, ItemStats, NewItem};
use crate::entity::uploaded_item;
use crate::quota::{Admission, LimitedReader, sniff_reader};
use crate::reference::{self, ReferenceError, ReferenceStyle};
use crate::utils::filename::{basename, split_extension};

/// Insert attempts before a reference collision is reported as a conflict.
pub const MAX_REFERENCE_ATTEMPTS: usize = 5;

/// Produces the public reference for an upload from its style and original name.
pub type ReferenceGenerator = fn(ReferenceStyle, &str) -> Result<String, ReferenceError>;

const BLOB_PREFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MAX_PAGE_SIZE: u64 = 100;

pub struct UploadRequest {
    pub owner_id: i32,
    pub reader: BoxReader,
    pub original_name: String,
    /// `Content-Length` of the enclosing request, when known.
    pub content_length: Option<u64>,
    /// Size of the file itself.
    pub declared_size: u64,
    /// Falls back to `upload.default_style`.
    pub style: Option<ReferenceStyle>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub item: uploaded_item::Model,
    pub url: String,
}

pub struct ResolvedFile {
    pub item: uploaded_item::Model,
    pub blob: BlobObject,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Deletes a written blob if the upload is abandoned before its row is committed.
struct BlobCleanupGuard {
    store: Arc<dyn BlobStore>,
    key: String,
    defused: bool,
}

impl BlobCleanupGuard {
    fn new(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            defused: false,
        }
    }

    fn defuse(&mut self) {
        self.defused = true;
    }
}

impl Drop for BlobCleanupGuard {
    fn drop(&mut self) {
        if self.defused {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(blob_key = %self.key, "No runtime to remove abandoned blob");
            return;
        };
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        handle.spawn(async move {
            match store.delete(&key).await {
                Ok(_) => debug!(blob_key = %key, "Removed blob of abandoned upload"),
                Err(e) => warn!(blob_key = %key, error = %e, "Failed to remove blob of abandoned upload"),
            }
        });
    }
}

#[derive(Clone)]
pub struct UploadService {
    catalog: Catalog,
    store: Arc<dyn BlobStore>,
    admission: Admission,
    expires_in: chrono::Duration,
    default_style: ReferenceStyle,
    base_url: String,
    generate_reference: ReferenceGenerator,
}

impl UploadService {
    pub fn new(
        catalog: Catalog,
        store: Arc<dyn BlobStore>,
        admission: Admission,
        expires_in: std::time::Duration,
        default_style: ReferenceStyle,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            store,
            admission,
            expires_in: chrono::Duration::from_std(expires_in)
                .unwrap_or(chrono::Duration::MAX),
            default_style,
            base_url: base_url.into(),
            generate_reference: reference::generate_for_upload,
        }
    }

    /// Replace the reference generator, e.g. with a deterministic one.
    pub fn with_reference_generator(mut self, generate: ReferenceGenerator) -> Self {
        self.generate_reference = generate;
        self
    }

    pub fn file_url(&self, reference: &str) -> String {
        format!("{}/f/{}", self.base_url, reference)
    }

    /// Admit, store and catalog one file.
    ///
    /// The blob is written once; only reference generation and the row insert are
    /// retried. Whenever no row ends up pointing at the blob, the blob is removed.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadedFile, ServiceError> {
        let UploadRequest {
            owner_id,
            reader,
            original_name,
            content_length,
            declared_size,
            style,
        } = request;

        let used = self.catalog.owner_stats(owner_id).await?.total_size;
        self.admission.check(content_length, declared_size, used)?;

        let (mime_type, reader) = sniff_reader(reader).await?;
        let (limited, tripped) = LimitedReader::new(reader, declared_size);

        let original_name = basename(&original_name).to_string();
        let blob_key = new_blob_key(&original_name)?;

        let written = match self.store.write(&blob_key, Box::new(limited)).await {
            Ok(n) => n,
            Err(_) if tripped.load(Ordering::SeqCst) => {
                return Err(ServiceError::PayloadTooLarge(format!(
                    "upload exceeds its declared size of {declared_size} bytes"
                )));
            }
            Err(e) => {
                error!(blob_key = %blob_key, owner_id, error = %e, "Blob write failed");
                return Err(e.into());
            }
        };

        let mut guard = BlobCleanupGuard::new(self.store.clone(), blob_key.clone());
        let style = style.unwrap_or(self.default_style);
        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_signed(self.expires_in)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let id = Uuid::now_v7();

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let reference = match (self.generate_reference)(style, &original_name) {
                Ok(reference) => reference,
                Err(e) => {
                    guard.defuse();
                    self.discard_blob(&blob_key).await;
                    return Err(e.into());
                }
            };

            let item = NewItem {
                id,
                owner_id: Some(owner_id),
                original_name: original_name.clone(),
                blob_key: blob_key.clone(),
                mime_type: mime_type.to_string(),
                size: i64::try_from(written).unwrap_or(i64::MAX),
                created_at,
                expires_at,
                reference,
            };

            match self.catalog.create_item_with_reference(item).await {
                Ok(item) => {
                    guard.defuse();
                    info!(
                        reference = %item.reference,
                        blob_key = %item.blob_key,
                        owner_id,
                        size = item.size,
                        "Stored upload"
                    );
                    let url = self.file_url(&item.reference);
                    return Ok(UploadedFile { item, url });
                }
                Err(CatalogError::DuplicateReference) => {
                    debug!(attempt, style = %style, "Reference collision, retrying");
                }
                Err(e) => {
                    guard.defuse();
                    self.discard_blob(&blob_key).await;
                    return Err(e.into());
                }
            }
        }

        guard.defuse();
        self.discard_blob(&blob_key).await;
        Err(ReferenceError::CollisionExhausted(MAX_REFERENCE_ATTEMPTS).into())
    }

    async fn discard_blob(&self, blob_key: &str) {
        if let Err(e) = self.store.delete(blob_key).await {
            error!(blob_key, error = %e, "Failed to delete blob of rejected upload");
        }
    }

    /// Open an item for download and count the access.
    pub async fn resolve(&self, reference: &str) -> Result<ResolvedFile, ServiceError> {
        let item = self
            .catalog
            .item_by_reference(reference)
            .await?
            .ok_or(ServiceError::NotFound("file"))?;

        if item.expires_at <= Utc::now() {
            return Err(ServiceError::Expired("file"));
        }

        if let Err(e) = self.catalog.increment_item_access(item.id).await {
            warn!(reference, error = %e, "Failed to record file access");
        }

        let mut blob = match self.store.stream(&item.blob_key).await {
            Ok(blob) => blob,
            Err(common::storage::StorageError::NotFound(_)) => {
                warn!(reference, blob_key = %item.blob_key, "Catalog row has no blob");
                return Err(ServiceError::NotFound("file"));
            }
            Err(e) => return Err(e.into()),
        };
        if blob.content_type.is_empty() || blob.content_type == OCTET_STREAM {
            blob.content_type = item.mime_type.clone();
        }

        Ok(ResolvedFile { item, blob })
    }

    /// Remove an item the caller owns: blob first, then row.
    pub async fn delete(&self, owner_id: i32, id: Uuid) -> Result<(), ServiceError> {
        let item = self
            .catalog
            .item_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("file"))?;

        if item.owner_id != Some(owner_id) {
            return Err(ServiceError::Unauthorized);
        }

        self.store.delete(&item.blob_key).await.inspect_err(|e| {
            error!(blob_key = %item.blob_key, error = %e, "Failed to delete blob, row kept");
        })?;

        match self.catalog.delete_item(id).await {
            Ok(true) => {
                info!(reference = %item.reference, owner_id, "Deleted upload");
                Ok(())
            }
            Ok(false) => Err(ServiceError::NotFound("file")),
            Err(e) => {
                error!(
                    item_id = %id,
                    blob_key = %item.blob_key,
                    error = %e,
                    "Blob deleted but row remains, left for reconciliation"
                );
                Err(e.into())
            }
        }
    }

    /// One page of the owner's items, newest first. `page` is 1-based.
    pub async fn list(
        &self,
        owner_id: i32,
        page: u64,
        limit: u64,
    ) -> Result<Page<uploaded_item::Model>, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let total = self.catalog.count_items_by_owner(owner_id).await?;
        let items = self
            .catalog
            .items_by_owner(owner_id, limit, (page - 1) * limit)
            .await?;
        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    pub async fn stats(&self, owner_id: i32) -> Result<ItemStats, ServiceError> {
        Ok(self.catalog.owner_stats(owner_id).await?)
    }
}

/// `{4 random [a-z0-9]}-{unix nanos}{ext}`.
fn new_blob_key(original_name: &str) -> Result<String, ReferenceError> {
    let prefix = reference::random_string(BLOB_PREFIX_ALPHABET, 4)?;
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let ext = split_extension(original_name).1.unwrap_or_default();
    Ok(format!("{prefix}-{nanos}{ext}"))
}
