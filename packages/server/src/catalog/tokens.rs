use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::{Catalog, CatalogError, classify};
use crate::entity::api_token;

#[derive(Debug, Clone)]
pub struct NewToken {
    pub owner_id: i32,
    pub name: String,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Catalog {
    /// A token value that already exists is [`CatalogError::Duplicate`].
    pub async fn create_token(&self, token: NewToken) -> Result<api_token::Model, CatalogError> {
        let model = api_token::ActiveModel {
            owner_id: Set(token.owner_id),
            name: Set(token.name),
            token: Set(token.token),
            created_at: Set(Utc::now()),
            last_used_at: Set(None),
            expires_at: Set(token.expires_at),
            revoked_at: Set(None),
            active: Set(true),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(classify)
    }

    pub async fn token_by_value(
        &self,
        value: &str,
    ) -> Result<Option<api_token::Model>, CatalogError> {
        Ok(api_token::Entity::find()
            .filter(api_token::Column::Token.eq(value))
            .one(&self.db)
            .await?)
    }

    pub async fn tokens_by_owner(
        &self,
        owner_id: i32,
    ) -> Result<Vec<api_token::Model>, CatalogError> {
        Ok(api_token::Entity::find()
            .filter(api_token::Column::OwnerId.eq(owner_id))
            .order_by_desc(api_token::Column::CreatedAt)
            .order_by_desc(api_token::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Revoke one of `owner_id`'s tokens. Returns `false` if no such live token exists.
    pub async fn revoke_token(&self, owner_id: i32, id: i32) -> Result<bool, CatalogError> {
        let result = api_token::Entity::update_many()
            .col_expr(api_token::Column::RevokedAt, Expr::value(Some(Utc::now())))
            .col_expr(api_token::Column::Active, Expr::value(false))
            .filter(api_token::Column::Id.eq(id))
            .filter(api_token::Column::OwnerId.eq(owner_id))
            .filter(api_token::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn touch_token(&self, id: i32) -> Result<(), CatalogError> {
        api_token::Entity::update_many()
            .col_expr(api_token::Column::LastUsedAt, Expr::value(Some(Utc::now())))
            .filter(api_token::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
