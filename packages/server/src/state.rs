use std::sync::Arc;
use std::time::Duration;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::geoip::GeoIpResolver;
use crate::quota::Admission;
use crate::services::{ClickRecorder, ShortenerService, TokenService, UploadService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Catalog,
    pub store: Arc<dyn BlobStore>,
    pub uploads: UploadService,
    pub shortener: ShortenerService,
    pub tokens: TokenService,
}

impl AppState {
    /// Wire every service around one catalog and one blob store.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        store: Arc<dyn BlobStore>,
        geoip: Arc<GeoIpResolver>,
    ) -> anyhow::Result<Self> {
        let catalog = Catalog::new(db);
        let base_url = config.base_url().to_string();

        let uploads = UploadService::new(
            catalog.clone(),
            store.clone(),
            Admission::new(&config.upload),
            config.upload.expires_in,
            config.upload.default_style,
            base_url.clone(),
        );

        let clicks = ClickRecorder::new(
            catalog.clone(),
            config.analytics.max_in_flight,
            Duration::from_secs(config.analytics.timeout_secs),
        );
        let shortener = ShortenerService::new(catalog.clone(), geoip, clicks, base_url);

        let tokens = TokenService::new(catalog.clone(), config.auth.secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid auth.secret: {e}"))?;

        Ok(Self {
            config: Arc::new(config),
            catalog,
            store,
            uploads,
            shortener,
            tokens,
        })
    }
}
