use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "uploaded_item")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Nulled when the owning user is deleted; the item lives until it expires.
    #[sea_orm(indexed)]
    pub owner_id: Option<i32>,

    #[sea_orm(belongs_to, from = "owner_id", to = "id", on_delete = "SetNull")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(column_type = "Text")]
    pub original_name: String,

    /// Key of the blob in the storage backend.
    #[sea_orm(unique)]
    pub blob_key: String,

    /// Sniffed from the content, never taken from the client.
    pub mime_type: String,

    pub size: i64,

    pub created_at: DateTimeUtc,
    pub last_accessed_at: Option<DateTimeUtc>,
    pub access_count: i64,

    #[sea_orm(indexed)]
    pub expires_at: DateTimeUtc,

    /// Public short reference served at `/f/{reference}`.
    #[sea_orm(unique)]
    pub reference: String,
}

impl ActiveModelBehavior for ActiveModel {}
