use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use common::storage::BoxReader;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppQuery;
use crate::models::shared::Pagination;
use crate::models::upload::{
    ItemListResponse, ItemResponse, ListItemsQuery, StatsResponse, UploadQuery,
};
use crate::quota::Admission;
use crate::services::{ServiceError, UploadRequest};
use crate::state::AppState;

/// Multipart framing allowance on top of `upload.max_size`.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const DEFAULT_PAGE_SIZE: u64 = 20;

pub fn upload_body_limit(max_size: u64) -> DefaultBodyLimit {
    let limit = usize::try_from(max_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(limit)
}

#[utoipa::path(
    post,
    path = "/uploads",
    tag = "Uploads",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Stores the `file` multipart field and returns its public `/f/{reference}` URL. \
        The content type is detected from the first 512 bytes. Counts against the caller's quota.",
    params(UploadQuery),
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 201, description = "File stored", body = ItemResponse),
        (status = 400, description = "Bad request (VALIDATION_ERROR, NO_FILE, READ_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "No unique reference could be generated (CONFLICT)", body = ErrorBody),
        (status = 413, description = "Too large (PAYLOAD_TOO_LARGE, QUOTA_EXCEEDED)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user, headers, multipart), fields(owner_id = auth_user.user_id))]
pub async fn upload_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UploadQuery>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let upload_config = &state.config.upload;
    Admission::new(upload_config)
        .check_request_length(content_length)
        .map_err(ServiceError::from)?;
    let max_size = upload_config.max_size;

    let mut spooled: Option<(TempPath, String, u64)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") || spooled.is_some() {
            continue; // Ignore unknown fields.
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let (file, path) = tempfile::Builder::new()
            .prefix("depot-upload-")
            .tempfile_in(upload_config.spool_dir())
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?
            .into_parts();
        // `path` removes the file when dropped, including on client disconnect.
        let size = spool_field(field, tokio::fs::File::from_std(file), max_size).await?;
        spooled = Some((path, file_name, size));
    }

    let (temp_path, file_name, size) = spooled.ok_or(AppError::NoFile)?;

    let file = tokio::fs::File::open(&temp_path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
    let reader: BoxReader = Box::new(file);

    let uploaded = state
        .uploads
        .upload(UploadRequest {
            owner_id: auth_user.user_id,
            reader,
            original_name: file_name,
            content_length,
            declared_size: size,
            style: query.style,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse::new(uploaded.item, uploaded.url)),
    ))
}

/// Copy one multipart field into `temp_file`, stopping once it outgrows `max_size`.
async fn spool_field(
    mut field: Field<'_>,
    mut temp_file: tokio::fs::File,
    max_size: u64,
) -> Result<u64, AppError> {
    let mut total_size: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        total_size += chunk.len() as u64;
        if total_size > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        temp_file
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
    }

    temp_file
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
    Ok(total_size)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::ReadError(format!("Upload read error: {}", e.body_text()))
    }
}

#[utoipa::path(
    get,
    path = "/items",
    tag = "Uploads",
    operation_id = "listItems",
    summary = "List your uploads",
    description = "Newest first. `limit` is clamped to 1-100.",
    params(ListItemsQuery),
    responses(
        (status = 200, description = "One page of uploads", body = ItemListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn list_items(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListItemsQuery>,
) -> Result<Json<ItemListResponse>, AppError> {
    let page = state
        .uploads
        .list(
            auth_user.user_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    let items = page
        .items
        .into_iter()
        .map(|item| {
            let url = state.uploads.file_url(&item.reference);
            ItemResponse::new(item, url)
        })
        .collect();

    Ok(Json(ItemListResponse {
        items,
        pagination: Pagination::new(page.page, page.limit, page.total),
    }))
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "Uploads",
    operation_id = "deleteItem",
    summary = "Delete one of your uploads",
    description = "Removes the stored bytes, then the catalog entry.",
    params(("id" = String, Path, description = "Item ID (UUID)")),
    responses(
        (status = 204, description = "Upload deleted"),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your upload (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Upload not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn delete_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::Validation("Invalid item ID".into()))?;
    state.uploads.delete(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Uploads",
    operation_id = "getStats",
    summary = "Storage statistics for the caller",
    responses(
        (status = 200, description = "Usage summary", body = StatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn get_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.uploads.stats(auth_user.user_id).await?;
    Ok(Json(StatsResponse::new(
        stats,
        state.config.upload.user_quota,
    )))
}
