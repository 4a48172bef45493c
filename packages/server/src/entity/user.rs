use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Opaque verifier produced by the external password hasher.
    #[serde(skip_serializing)]
    pub password_verifier: String,

    pub active: bool,

    #[sea_orm(has_many)]
    pub uploaded_items: HasMany<super::uploaded_item::Entity>,

    #[sea_orm(has_many)]
    pub shortened_urls: HasMany<super::shortened_url::Entity>,

    #[sea_orm(has_many)]
    pub api_tokens: HasMany<super::api_token::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
