//! API tokens: random bytes followed by their HMAC-SHA256 tag, base64url encoded.
//!
//! The tag lets forged or mistyped tokens be rejected without touching the catalog.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::ServiceError;
use crate::catalog::{Catalog, CatalogError, NewToken};
use crate::entity::{api_token, user};
use crate::reference::{self, ReferenceError};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 32;
const TAG_LEN: usize = 32;
const MAX_ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: api_token::Model,
    /// Plain token value. Only returned once, at issue time.
    pub value: String,
}

/// The user a valid token belongs to.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: user::Model,
    pub token_id: i32,
}

#[derive(Clone)]
pub struct TokenService {
    catalog: Catalog,
    /// Keyed with the server secret; cloned per token.
    keyed: HmacSha256,
}

impl TokenService {
    pub fn new(catalog: Catalog, secret: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(Self {
            catalog,
            keyed: HmacSha256::new_from_slice(secret.as_ref())?,
        })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    fn mint(&self) -> Result<String, ReferenceError> {
        let nonce = reference::random_bytes::<NONCE_LEN>()?;
        let mut mac = self.mac();
        mac.update(&nonce);
        let tag = mac.finalize().into_bytes();

        let mut raw = Vec::with_capacity(NONCE_LEN + TAG_LEN);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&tag);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// `true` if `value` carries a tag produced with this service's secret.
    pub fn verify_signature(&self, value: &str) -> bool {
        let Ok(raw) = URL_SAFE_NO_PAD.decode(value.trim()) else {
            return false;
        };
        if raw.len() != NONCE_LEN + TAG_LEN {
            return false;
        }
        let (nonce, tag) = raw.split_at(NONCE_LEN);
        let mut mac = self.mac();
        mac.update(nonce);
        mac.verify_slice(tag).is_ok()
    }

    pub async fn issue(
        &self,
        owner_id: i32,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<IssuedToken, ServiceError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(ServiceError::InvalidInput(
                "token name must be 1-100 characters".into(),
            ));
        }
        if let Some(at) = expires_at
            && at <= Utc::now()
        {
            return Err(ServiceError::InvalidInput(
                "expiration must be in the future".into(),
            ));
        }

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let value = self.mint()?;
            let row = NewToken {
                owner_id,
                name: name.to_string(),
                token: value.clone(),
                expires_at,
            };
            match self.catalog.create_token(row).await {
                Ok(token) => {
                    info!(owner_id, token_id = token.id, name, "Issued API token");
                    return Ok(IssuedToken { token, value });
                }
                Err(CatalogError::Duplicate(_)) => {
                    debug!(attempt, "Token collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReferenceError::CollisionExhausted(MAX_ISSUE_ATTEMPTS).into())
    }

    /// Resolve a presented token to its owner. Every failure is [`ServiceError::Unauthorized`]
    /// except catalog errors.
    pub async fn validate(&self, value: &str) -> Result<Authenticated, ServiceError> {
        let value = value.trim();
        if !self.verify_signature(value) {
            return Err(ServiceError::Unauthorized);
        }

        let token = self
            .catalog
            .token_by_value(value)
            .await?
            .ok_or(ServiceError::Unauthorized)?;
        if !token.is_valid_at(Utc::now()) {
            return Err(ServiceError::Unauthorized);
        }

        let owner = self
            .catalog
            .user_by_id(token.owner_id)
            .await?
            .filter(|user| user.active)
            .ok_or(ServiceError::Unauthorized)?;

        if let Err(e) = self.catalog.touch_token(token.id).await {
            warn!(token_id = token.id, error = %e, "Failed to update token last use");
        }

        Ok(Authenticated {
            user: owner,
            token_id: token.id,
        })
    }

    pub async fn list(&self, owner_id: i32) -> Result<Vec<api_token::Model>, ServiceError> {
        Ok(self.catalog.tokens_by_owner(owner_id).await?)
    }

    pub async fn revoke(&self, owner_id: i32, id: i32) -> Result<(), ServiceError> {
        if self.catalog.revoke_token(owner_id, id).await? {
            info!(owner_id, token_id = id, "Revoked API token");
            Ok(())
        } else {
            Err(ServiceError::NotFound("token"))
        }
    }
}
