use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::Set;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use url::Url;

use super::ServiceError;
use crate::catalog::{Catalog, CatalogError, NewShortUrl, UrlAnalytics, UrlLookup};
use crate::entity::{click_event, shortened_url};
use crate::geoip::{GeoIpResolver, GeoLocation};
use crate::reference::{self, ReferenceError};

/// Attempts at a random code before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct CreateShortUrl {
    pub url: String,
    /// Custom code. `None` or empty generates one.
    pub vanity: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreatedShortUrl {
    pub url: shortened_url::Model,
    pub short_url: String,
}

/// Request facts recorded with a click.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub referrer: String,
    pub user_agent: String,
    pub ip: String,
}

/// Records clicks off the request path, each under its own deadline.
#[derive(Clone)]
pub struct ClickRecorder {
    catalog: Catalog,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    deadline: Duration,
}

impl ClickRecorder {
    pub fn new(catalog: Catalog, max_in_flight: usize, deadline: Duration) -> Self {
        Self {
            catalog,
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_in_flight)),
            deadline,
        }
    }

    /// Tracker owning every in-flight click task, for draining at shutdown.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Queue a click. Dropped with a warning when too many are already in flight.
    pub fn record(&self, url_id: i32, short_code: &str, request: RequestInfo, location: GeoLocation) {
        let Ok(permit) = self.permits.clone().try_acquire_owned() else {
            warn!(short_code, "Analytics saturated, click dropped");
            return;
        };

        let catalog = self.catalog.clone();
        let deadline = self.deadline;
        let short_code = short_code.to_string();

        self.tracker.spawn(async move {
            let _permit = permit;
            let work = async {
                let click = click_event::ActiveModel {
                    url_id: Set(url_id),
                    clicked_at: Set(Utc::now()),
                    referrer: Set(request.referrer),
                    user_agent: Set(request.user_agent),
                    ip_address: Set(request.ip),
                    country_code: Set(location.country_code),
                    city: Set(location.city),
                    region: Set(location.region),
                    ..Default::default()
                };
                if let Err(e) = catalog.increment_url_access(url_id).await {
                    warn!(short_code = %short_code, error = %e, "Failed to count URL access");
                }
                if let Err(e) = catalog.record_click(click).await {
                    warn!(short_code = %short_code, error = %e, "Failed to record click");
                }
            };

            if tokio::time::timeout(deadline, work).await.is_err() {
                warn!(short_code = %short_code, ?deadline, "Click recording timed out");
            }
        });
    }
}

#[derive(Clone)]
pub struct ShortenerService {
    catalog: Catalog,
    geoip: Arc<GeoIpResolver>,
    clicks: ClickRecorder,
    base_url: String,
}

impl ShortenerService {
    pub fn new(
        catalog: Catalog,
        geoip: Arc<GeoIpResolver>,
        clicks: ClickRecorder,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            geoip,
            clicks,
            base_url: base_url.into(),
        }
    }

    pub fn clicks(&self) -> &ClickRecorder {
        &self.clicks
    }

    pub fn short_url(&self, code: &str) -> String {
        format!("{}/s/{}", self.base_url, code)
    }

    pub async fn create(
        &self,
        owner_id: i32,
        request: CreateShortUrl,
    ) -> Result<CreatedShortUrl, ServiceError> {
        let original_url = validate_target(&request.url)?;

        if let Some(expires_at) = request.expires_at
            && expires_at <= Utc::now()
        {
            return Err(ServiceError::InvalidInput(
                "expiration must be in the future".into(),
            ));
        }

        // Only an absent or empty code asks for a generated one; anything else is validated as sent.
        let vanity = request.vanity.as_deref().filter(|code| !code.is_empty());

        let url = match vanity {
            Some(code) => {
                reference::validate_vanity(code).map_err(ServiceError::InvalidInput)?;
                self.catalog
                    .create_url(NewShortUrl {
                        owner_id,
                        original_url,
                        short_code: code.to_string(),
                        expires_at: request.expires_at,
                        is_vanity: true,
                    })
                    .await
                    .map_err(|e| match e {
                        CatalogError::Duplicate(_) => {
                            ServiceError::Conflict(format!("short code '{code}' is already taken"))
                        }
                        other => other.into(),
                    })?
            }
            None => self.create_generated(owner_id, original_url, request.expires_at).await?,
        };

        info!(short_code = %url.short_code, owner_id, vanity = url.is_vanity, "Created short URL");
        let short_url = self.short_url(&url.short_code);
        Ok(CreatedShortUrl { url, short_url })
    }

    async fn create_generated(
        &self,
        owner_id: i32,
        original_url: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<shortened_url::Model, ServiceError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let row = NewShortUrl {
                owner_id,
                original_url: original_url.clone(),
                short_code: reference::random_code()?,
                expires_at,
                is_vanity: false,
            };
            match self.catalog.create_url(row).await {
                Ok(url) => return Ok(url),
                Err(CatalogError::Duplicate(_)) => {
                    debug!(attempt, "Short code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReferenceError::CollisionExhausted(MAX_CODE_ATTEMPTS).into())
    }

    /// Target of `code` for a redirect. The click is recorded in the background.
    pub async fn resolve(&self, code: &str, request: RequestInfo) -> Result<String, ServiceError> {
        let url = match self.catalog.url_by_short_code(code).await? {
            UrlLookup::Found(url) => url,
            UrlLookup::Expired => return Err(ServiceError::Expired("short URL")),
            UrlLookup::Missing => return Err(ServiceError::NotFound("short URL")),
        };

        let location = self.geoip.lookup(&request.ip);
        self.clicks.record(url.id, &url.short_code, request, location);

        Ok(url.original_url)
    }

    pub async fn list(&self, owner_id: i32) -> Result<Vec<shortened_url::Model>, ServiceError> {
        Ok(self.catalog.urls_by_owner(owner_id).await?)
    }

    /// Soft-delete by numeric id or by short code. The code stays reserved.
    pub async fn delete(&self, owner_id: i32, id_or_code: &str) -> Result<(), ServiceError> {
        let by_id = match id_or_code.parse::<i32>() {
            Ok(id) => self.catalog.url_by_id(id).await?,
            Err(_) => None,
        };
        let url = match by_id {
            Some(url) => url,
            None => self
                .catalog
                .url_by_code(id_or_code)
                .await?
                .ok_or(ServiceError::NotFound("short URL"))?,
        };

        if url.owner_id != owner_id {
            return Err(ServiceError::Unauthorized);
        }
        if !self.catalog.soft_delete_url(url.id).await? {
            return Err(ServiceError::NotFound("short URL"));
        }

        info!(short_code = %url.short_code, owner_id, "Deleted short URL");
        Ok(())
    }

    /// Set or clear the expiry of an active URL.
    pub async fn update_expiration(
        &self,
        owner_id: i32,
        id: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<shortened_url::Model, ServiceError> {
        let url = self.owned_url(owner_id, id).await?;

        if let Some(at) = expires_at
            && at <= Utc::now()
        {
            return Err(ServiceError::InvalidInput(
                "expiration must be in the future".into(),
            ));
        }

        let mut active: shortened_url::ActiveModel = url.into();
        active.expires_at = Set(expires_at);
        Ok(self.catalog.update_url(active).await?)
    }

    pub async fn analytics(&self, owner_id: i32, id: i32) -> Result<UrlAnalytics, ServiceError> {
        let url = self.owned_url(owner_id, id).await?;
        Ok(self.catalog.url_analytics(url.id).await?)
    }

    async fn owned_url(&self, owner_id: i32, id: i32) -> Result<shortened_url::Model, ServiceError> {
        let url = self
            .catalog
            .url_by_id(id)
            .await?
            .filter(|url| url.active)
            .ok_or(ServiceError::NotFound("short URL"))?;
        if url.owner_id != owner_id {
            return Err(ServiceError::Unauthorized);
        }
        Ok(url)
    }
}

/// Accept absolute http(s) URLs with a host and no fragment.
fn validate_target(raw: &str) -> Result<String, ServiceError> {
    let raw = raw.trim();
    let parsed =
        Url::parse(raw).map_err(|e| ServiceError::InvalidInput(format!("invalid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServiceError::InvalidInput(
            "URL scheme must be http or https".into(),
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ServiceError::InvalidInput("URL must have a host".into()));
    }
    if parsed.fragment().is_some() {
        return Err(ServiceError::InvalidInput(
            "URL must not contain a fragment".into(),
        ));
    }
    Ok(raw.to_string())
}
