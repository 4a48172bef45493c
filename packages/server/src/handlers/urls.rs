use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::url::{AnalyticsResponse, CreateUrlRequest, UpdateUrlRequest, UrlResponse};
use crate::services::CreateShortUrl;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/urls",
    tag = "Short URLs",
    operation_id = "createShortUrl",
    summary = "Shorten a URL",
    description = "Uses `custom_code` when given, otherwise generates an 8 character code.",
    request_body = CreateUrlRequest,
    responses(
        (status = 201, description = "Short URL created", body = UrlResponse),
        (status = 400, description = "Invalid URL, code or expiry (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Code already taken (CONFLICT)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(owner_id = auth_user.user_id))]
pub async fn create_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state
        .shortener
        .create(
            auth_user.user_id,
            CreateShortUrl {
                url: payload.url,
                vanity: payload.custom_code,
                expires_at: payload.expires_at,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UrlResponse::new(created.url, created.short_url)),
    ))
}

#[utoipa::path(
    get,
    path = "/urls",
    tag = "Short URLs",
    operation_id = "listShortUrls",
    summary = "List your short URLs",
    description = "Active URLs only, newest first.",
    responses(
        (status = 200, description = "Your short URLs", body = Vec<UrlResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn list_urls(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UrlResponse>>, AppError> {
    let urls = state.shortener.list(auth_user.user_id).await?;
    Ok(Json(
        urls.into_iter()
            .map(|url| {
                let short_url = state.shortener.short_url(&url.short_code);
                UrlResponse::new(url, short_url)
            })
            .collect(),
    ))
}

#[utoipa::path(
    delete,
    path = "/urls/{id}",
    tag = "Short URLs",
    operation_id = "deleteShortUrl",
    summary = "Delete a short URL",
    description = "Deactivates the URL. Its code is never handed out again.",
    params(("id" = String, Path, description = "Numeric ID or short code")),
    responses(
        (status = 204, description = "Short URL deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your URL (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Short URL not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn delete_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.shortener.delete(auth_user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/urls/{id}",
    tag = "Short URLs",
    operation_id = "updateShortUrl",
    summary = "Change the expiry of a short URL",
    params(("id" = i32, Path, description = "Short URL ID")),
    request_body = UpdateUrlRequest,
    responses(
        (status = 200, description = "Short URL updated", body = UrlResponse),
        (status = 400, description = "Expiry in the past (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your URL (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Short URL not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(owner_id = auth_user.user_id))]
pub async fn update_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUrlRequest>,
) -> Result<Json<UrlResponse>, AppError> {
    let Some(expires_at) = payload.expires_at else {
        return Err(AppError::Validation(
            "Nothing to update: expected `expires_at`".into(),
        ));
    };

    let url = state
        .shortener
        .update_expiration(auth_user.user_id, id, expires_at)
        .await?;
    let short_url = state.shortener.short_url(&url.short_code);
    Ok(Json(UrlResponse::new(url, short_url)))
}

#[utoipa::path(
    get,
    path = "/urls/{id}/analytics",
    tag = "Short URLs",
    operation_id = "getShortUrlAnalytics",
    summary = "Click analytics for a short URL",
    params(("id" = i32, Path, description = "Short URL ID")),
    responses(
        (status = 200, description = "Click summary", body = AnalyticsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your URL (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Short URL not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn url_analytics(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let analytics = state.shortener.analytics(auth_user.user_id, id).await?;
    Ok(Json(analytics.into()))
}
