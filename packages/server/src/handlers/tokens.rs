use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::token::{CreateTokenRequest, IssuedTokenResponse, TokenResponse};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/tokens",
    tag = "Tokens",
    operation_id = "createToken",
    summary = "Issue a new API token",
    description = "The token value is only included in this response.",
    request_body = CreateTokenRequest,
    responses(
        (status = 201, description = "Token issued", body = IssuedTokenResponse),
        (status = 400, description = "Invalid name or expiry (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(owner_id = auth_user.user_id))]
pub async fn create_token(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state
        .tokens
        .issue(auth_user.user_id, &payload.name, payload.expires_at)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedTokenResponse {
            token: issued.value,
            info: issued.token.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/tokens",
    tag = "Tokens",
    operation_id = "listTokens",
    summary = "List your API tokens",
    responses(
        (status = 200, description = "Token metadata, newest first", body = Vec<TokenResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn list_tokens(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TokenResponse>>, AppError> {
    let tokens = state.tokens.list(auth_user.user_id).await?;
    Ok(Json(tokens.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/tokens/{id}",
    tag = "Tokens",
    operation_id = "revokeToken",
    summary = "Revoke an API token",
    params(("id" = i32, Path, description = "Token ID")),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No such live token (NOT_FOUND)", body = ErrorBody),
    ),
    security(("bearer" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = auth_user.user_id))]
pub async fn revoke_token(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.tokens.revoke(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
