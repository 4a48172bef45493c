use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shortened_url")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub owner_id: i32,

    #[sea_orm(belongs_to, from = "owner_id", to = "id", on_delete = "Cascade")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(column_type = "Text")]
    pub original_url: String,

    /// Unique across all rows, soft-deleted ones included, so a code is never reused.
    #[sea_orm(unique)]
    pub short_code: String,

    pub created_at: DateTimeUtc,
    pub expires_at: Option<DateTimeUtc>,
    pub last_accessed_at: Option<DateTimeUtc>,
    pub access_count: i64,
    pub is_vanity: bool,
    pub active: bool,

    #[sea_orm(has_many)]
    pub clicks: HasMany<super::click_event::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
