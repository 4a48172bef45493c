use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::shared::double_option;
use crate::catalog::UrlAnalytics;
use crate::entity::shortened_url;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUrlRequest {
    /// Absolute http(s) URL to redirect to.
    #[schema(example = "https://example.com/some/very/long/path")]
    pub url: String,
    /// Optional custom code, 4-30 characters of `[A-Za-z0-9_-]`.
    #[schema(example = "launch-day")]
    pub custom_code: Option<String>,
    /// Must be in the future when set.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateUrlRequest {
    /// New expiry. `null` removes it; omitting the field changes nothing.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UrlResponse {
    pub id: i32,
    #[schema(example = "aZ3kP9qL")]
    pub short_code: String,
    #[schema(example = "https://depot.example/s/aZ3kP9qL")]
    pub short_url: String,
    pub original_url: String,
    pub is_vanity: bool,
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UrlResponse {
    pub fn new(model: shortened_url::Model, short_url: String) -> Self {
        Self {
            id: model.id,
            short_code: model.short_code,
            short_url,
            original_url: model.original_url,
            is_vanity: model.is_vanity,
            access_count: model.access_count,
            created_at: model.created_at,
            last_accessed_at: model.last_accessed_at,
            expires_at: model.expires_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct KeyCountResponse {
    pub key: String,
    pub count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DayCountResponse {
    #[schema(value_type = String, example = "2026-10-18")]
    pub day: NaiveDate,
    pub count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AnalyticsResponse {
    pub total_clicks: u64,
    /// Distinct client addresses.
    pub unique_clicks: u64,
    pub top_referrers: Vec<KeyCountResponse>,
    /// ISO country codes; `XX` when unknown.
    pub top_countries: Vec<KeyCountResponse>,
    /// Last 30 days, newest first. Days without clicks are omitted.
    pub clicks_by_day: Vec<DayCountResponse>,
}

impl From<UrlAnalytics> for AnalyticsResponse {
    fn from(a: UrlAnalytics) -> Self {
        let pairs = |v: Vec<crate::catalog::KeyCount>| {
            v.into_iter()
                .map(|k| KeyCountResponse {
                    key: k.key,
                    count: k.count,
                })
                .collect()
        };
        Self {
            total_clicks: a.total_clicks,
            unique_clicks: a.unique_clicks,
            top_referrers: pairs(a.top_referrers),
            top_countries: pairs(a.top_countries),
            clicks_by_day: a
                .clicks_by_day
                .into_iter()
                .map(|d| DayCountResponse {
                    day: d.day,
                    count: d.count,
                })
                .collect(),
        }
    }
}
