use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::services::ServiceError;
use crate::state::AppState;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. The token must be a
/// live API token whose owner is active.
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub token_id: i32,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let auth = state.tokens.validate(token).await.map_err(|e| match e {
            ServiceError::Unauthorized => AppError::TokenInvalid,
            other => other.into(),
        })?;

        Ok(AuthUser {
            user_id: auth.user.id,
            username: auth.user.username,
            token_id: auth.token_id,
        })
    }
}
