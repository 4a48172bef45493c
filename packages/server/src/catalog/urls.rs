use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::sea_query::{Condition, Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::{Catalog, CatalogError, classify};
use crate::entity::{click_event, shortened_url};

#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub owner_id: i32,
    pub original_url: String,
    pub short_code: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_vanity: bool,
}

/// Outcome of looking up a short code for redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlLookup {
    Found(shortened_url::Model),
    /// Active row whose `expires_at` has passed.
    Expired,
    /// Unknown code or soft-deleted row.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlAnalytics {
    pub total_clicks: u64,
    /// Distinct client IP addresses.
    pub unique_clicks: u64,
    /// Ten most common non-empty referrers.
    pub top_referrers: Vec<KeyCount>,
    /// Ten most common country codes, `XX` included.
    pub top_countries: Vec<KeyCount>,
    /// Clicks per UTC day over the last 30 days, newest day first.
    pub clicks_by_day: Vec<DayCount>,
}

const TOP_N: usize = 10;
const DAILY_WINDOW_DAYS: i64 = 30;

fn top_counts(counts: HashMap<String, u64>, n: usize) -> Vec<KeyCount> {
    let mut ranked: Vec<KeyCount> = counts
        .into_iter()
        .map(|(key, count)| KeyCount { key, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    ranked.truncate(n);
    ranked
}

impl Catalog {
    /// Insert a short URL. A taken short code is [`CatalogError::Duplicate`].
    pub async fn create_url(&self, url: NewShortUrl) -> Result<shortened_url::Model, CatalogError> {
        let model = shortened_url::ActiveModel {
            owner_id: Set(url.owner_id),
            original_url: Set(url.original_url),
            short_code: Set(url.short_code),
            created_at: Set(Utc::now()),
            expires_at: Set(url.expires_at),
            last_accessed_at: Set(None),
            access_count: Set(0),
            is_vanity: Set(url.is_vanity),
            active: Set(true),
            ..Default::default()
        };

        model.insert(&self.db).await.map_err(classify)
    }

    /// Resolve lookup. Only active, unexpired rows are [`UrlLookup::Found`].
    pub async fn url_by_short_code(&self, code: &str) -> Result<UrlLookup, CatalogError> {
        let now = Utc::now();
        let live = shortened_url::Entity::find()
            .filter(shortened_url::Column::ShortCode.eq(code))
            .filter(shortened_url::Column::Active.eq(true))
            .filter(
                Condition::any()
                    .add(shortened_url::Column::ExpiresAt.is_null())
                    .add(shortened_url::Column::ExpiresAt.gt(now)),
            )
            .one(&self.db)
            .await?;

        if let Some(url) = live {
            return Ok(UrlLookup::Found(url));
        }

        let expired = shortened_url::Entity::find()
            .filter(shortened_url::Column::ShortCode.eq(code))
            .filter(shortened_url::Column::Active.eq(true))
            .filter(shortened_url::Column::ExpiresAt.lte(now))
            .one(&self.db)
            .await?;

        Ok(match expired {
            Some(_) => UrlLookup::Expired,
            None => UrlLookup::Missing,
        })
    }

    /// Any row with `code`, whatever its state.
    pub async fn url_by_code(
        &self,
        code: &str,
    ) -> Result<Option<shortened_url::Model>, CatalogError> {
        Ok(shortened_url::Entity::find()
            .filter(shortened_url::Column::ShortCode.eq(code))
            .one(&self.db)
            .await?)
    }

    pub async fn url_by_id(&self, id: i32) -> Result<Option<shortened_url::Model>, CatalogError> {
        Ok(shortened_url::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Active URLs of `owner_id`, newest first.
    pub async fn urls_by_owner(
        &self,
        owner_id: i32,
    ) -> Result<Vec<shortened_url::Model>, CatalogError> {
        Ok(shortened_url::Entity::find()
            .filter(shortened_url::Column::OwnerId.eq(owner_id))
            .filter(shortened_url::Column::Active.eq(true))
            .order_by_desc(shortened_url::Column::CreatedAt)
            .order_by_desc(shortened_url::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn increment_url_access(&self, id: i32) -> Result<(), CatalogError> {
        let result = shortened_url::Entity::update_many()
            .col_expr(
                shortened_url::Column::AccessCount,
                Expr::col(shortened_url::Column::AccessCount).add(1),
            )
            .col_expr(
                shortened_url::Column::LastAccessedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(shortened_url::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    /// Sets `active = false`. Returns `false` if the row was missing or already inactive.
    pub async fn soft_delete_url(&self, id: i32) -> Result<bool, CatalogError> {
        let result = shortened_url::Entity::update_many()
            .col_expr(shortened_url::Column::Active, Expr::value(false))
            .filter(shortened_url::Column::Id.eq(id))
            .filter(shortened_url::Column::Active.eq(true))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Persist changes to an existing row.
    pub async fn update_url(
        &self,
        url: shortened_url::ActiveModel,
    ) -> Result<shortened_url::Model, CatalogError> {
        url.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => CatalogError::NotFound,
            other => classify(other),
        })
    }

    /// Deactivate every active URL whose expiry has passed. Returns the number of rows touched.
    pub async fn expire_overdue_urls(&self) -> Result<u64, CatalogError> {
        let result = shortened_url::Entity::update_many()
            .col_expr(shortened_url::Column::Active, Expr::value(false))
            .filter(shortened_url::Column::Active.eq(true))
            .filter(shortened_url::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn record_click(
        &self,
        click: click_event::ActiveModel,
    ) -> Result<click_event::Model, CatalogError> {
        Ok(click.insert(&self.db).await?)
    }

    pub async fn url_analytics(&self, url_id: i32) -> Result<UrlAnalytics, CatalogError> {
        let rows: Vec<(DateTime<Utc>, String, String, String)> = click_event::Entity::find()
            .select_only()
            .column(click_event::Column::ClickedAt)
            .column(click_event::Column::IpAddress)
            .column(click_event::Column::Referrer)
            .column(click_event::Column::CountryCode)
            .filter(click_event::Column::UrlId.eq(url_id))
            .into_tuple()
            .all(&self.db)
            .await?;

        let window_start = (Utc::now() - Duration::days(DAILY_WINDOW_DAYS - 1)).date_naive();

        let mut unique_ips: HashSet<String> = HashSet::new();
        let mut referrers: HashMap<String, u64> = HashMap::new();
        let mut countries: HashMap<String, u64> = HashMap::new();
        let mut days: HashMap<NaiveDate, u64> = HashMap::new();
        let total_clicks = rows.len() as u64;

        for (clicked_at, ip, referrer, country) in rows {
            unique_ips.insert(ip);
            if !referrer.trim().is_empty() {
                *referrers.entry(referrer).or_insert(0) += 1;
            }
            *countries.entry(country).or_insert(0) += 1;

            let day = clicked_at.date_naive();
            if day >= window_start {
                *days.entry(day).or_insert(0) += 1;
            }
        }

        let mut clicks_by_day: Vec<DayCount> = days
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect();
        clicks_by_day.sort_by(|a, b| b.day.cmp(&a.day));

        Ok(UrlAnalytics {
            total_clicks,
            unique_clicks: unique_ips.len() as u64,
            top_referrers: top_counts(referrers, TOP_N),
            top_countries: top_counts(countries, TOP_N),
            clicks_by_day,
        })
    }
}
