use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "click_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub url_id: i32,

    #[sea_orm(belongs_to, from = "url_id", to = "id", on_delete = "Cascade")]
    pub url: HasOne<super::shortened_url::Entity>,

    pub clicked_at: DateTimeUtc,

    #[sea_orm(column_type = "Text")]
    pub referrer: String,

    #[sea_orm(column_type = "Text")]
    pub user_agent: String,

    pub ip_address: String,

    /// ISO 3166-1 alpha-2, or `XX` when the address could not be located.
    pub country_code: String,
    pub city: String,
    pub region: String,
}

impl ActiveModelBehavior for ActiveModel {}
