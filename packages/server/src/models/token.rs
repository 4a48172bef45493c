use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::api_token;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateTokenRequest {
    /// Label shown in token listings, 1-100 characters.
    #[schema(example = "ci-uploader")]
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Token metadata. The secret value is never listed.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Whether the token would be accepted right now.
    pub valid: bool,
}

impl From<api_token::Model> for TokenResponse {
    fn from(model: api_token::Model) -> Self {
        let valid = model.is_valid_at(Utc::now());
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
            expires_at: model.expires_at,
            revoked_at: model.revoked_at,
            valid,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct IssuedTokenResponse {
    /// Bearer token. Returned only once.
    pub token: String,
    #[serde(flatten)]
    pub info: TokenResponse,
}
