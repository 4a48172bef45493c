use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::object::ObjectBlobStore;
use common::storage::{BlobStore, DeadlineBlobStore};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};

use depot::config::{AppConfig, RuntimeEnv, StorageProvider};
use depot::geoip::GeoIpResolver;
use depot::state::AppState;
use depot::worker::Worker;
use depot::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let dev = config.server.env == RuntimeEnv::Dev;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if dev { Level::DEBUG } else { Level::INFO })
        .init();

    let db = database::init_db(&config.database, dev)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db).await;
    info!("Database ready");

    let store = open_store(&config).await?;
    let geoip = Arc::new(GeoIpResolver::open(config.geoip.db_path.as_deref()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host or server.port")?;

    let state = AppState::new(config, db, store.clone(), geoip)?;
    seed::bootstrap_user(&state.catalog, &state.tokens, &state.config.bootstrap)
        .await
        .context("Failed to create bootstrap user")?;

    let shutdown = CancellationToken::new();
    let worker = Worker::new(state.catalog.clone(), store.clone(), &state.config.worker);
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let clicks = state.shortener.clicks().clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await
    .context("Server error")?;

    info!("Draining in-flight work");
    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!(error = %e, "Maintenance worker panicked");
    }

    let tracker = clicks.tracker();
    tracker.close();
    if tokio::time::timeout(clicks.deadline(), tracker.wait())
        .await
        .is_err()
    {
        warn!(
            pending = tracker.len(),
            "Click recordings still pending at shutdown"
        );
    }

    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close blob store");
    }
    info!("Shutdown complete");
    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let inner: Arc<dyn BlobStore> = match config.storage.provider {
        StorageProvider::Local => {
            let path = &config.storage.local_path;
            info!(path = %path.display(), "Using local blob storage");
            Arc::new(
                FilesystemBlobStore::new(path.clone())
                    .await
                    .context("Failed to open local blob storage")?,
            )
        }
        StorageProvider::Object => {
            let object = config
                .storage
                .object
                .as_ref()
                .context("storage.object is required for the object provider")?;
            info!(bucket = %object.bucket, "Using object blob storage");
            Arc::new(
                ObjectBlobStore::connect(object)
                    .await
                    .context("Failed to connect to object storage")?,
            )
        }
    };

    Ok(Arc::new(DeadlineBlobStore::new(
        inner,
        Duration::from_secs(config.storage.timeout_secs),
    )))
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
