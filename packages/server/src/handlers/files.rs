use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

#[utoipa::path(
    get,
    path = "/f/{reference}",
    tag = "Public",
    operation_id = "downloadFile",
    summary = "Download an uploaded file",
    description = "Streams the stored bytes. Every successful request counts as an access.",
    params(("reference" = String, Path, description = "Public file reference")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown reference (NOT_FOUND)", body = ErrorBody),
        (status = 410, description = "File expired (EXPIRED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Response, AppError> {
    let resolved = state.uploads.resolve(&reference).await?;
    let blob = resolved.blob;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &blob.content_type)
        .header(header::CONTENT_LENGTH, blob.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&resolved.item.original_name),
        )
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    if let Some(cache_control) = &blob.cache_control {
        response = response.header(header::CACHE_CONTROL, cache_control);
    }

    response
        .body(Body::from_stream(ReaderStream::new(blob.reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
