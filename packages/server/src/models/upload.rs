use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::catalog::ItemStats;
use crate::entity::uploaded_item;
use crate::reference::ReferenceStyle;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Reference style; defaults to the server's `upload.default_style`.
    pub style: Option<ReferenceStyle>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListItemsQuery {
    /// 1-based page number.
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page, 1-100.
    #[param(example = 20)]
    pub limit: Option<u64>,
}

/// A stored upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemResponse {
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Public reference, the last segment of the download URL.
    #[schema(example = "brave-teal-otter.png")]
    pub reference: String,
    #[schema(example = "https://depot.example/f/brave-teal-otter.png")]
    pub url: String,
    #[schema(example = "holiday.png")]
    pub original_name: String,
    #[schema(example = "image/png")]
    pub mime_type: String,
    #[schema(example = 142857)]
    pub size: i64,
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl ItemResponse {
    pub fn new(model: uploaded_item::Model, url: String) -> Self {
        Self {
            id: model.id.to_string(),
            reference: model.reference,
            url,
            original_name: model.original_name,
            mime_type: model.mime_type,
            size: model.size,
            access_count: model.access_count,
            created_at: model.created_at,
            last_accessed_at: model.last_accessed_at,
            expires_at: model.expires_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MimeCountResponse {
    #[schema(example = "image/png")]
    pub mime_type: String,
    pub count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub total_items: u64,
    /// Bytes currently stored.
    pub total_size: u64,
    pub total_views: u64,
    /// Bytes the user may store in total.
    pub quota: u64,
    /// At most five, most common first.
    pub top_mime_types: Vec<MimeCountResponse>,
}

impl StatsResponse {
    pub fn new(stats: ItemStats, quota: u64) -> Self {
        Self {
            total_items: stats.total_items,
            total_size: stats.total_size,
            total_views: stats.total_views,
            quota,
            top_mime_types: stats
                .top_mime_types
                .into_iter()
                .map(|m| MimeCountResponse {
                    mime_type: m.mime_type,
                    count: m.count,
                })
                .collect(),
        }
    }
}
