//! Background maintenance: expiry sweeps and storage/catalog reconciliation.

mod cleanup;
mod reconcile;

use std::sync::Arc;
use std::time::Duration;

use common::storage::BlobStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::WorkerConfig;

pub use cleanup::CleanupReport;
pub use reconcile::ReconcileReport;

pub struct Worker {
    catalog: Catalog,
    store: Arc<dyn BlobStore>,
    cleanup_interval: Duration,
    reconcile_interval: Duration,
    /// Storage-only blobs younger than this are left alone.
    reconcile_grace: Duration,
}

impl Worker {
    pub fn new(catalog: Catalog, store: Arc<dyn BlobStore>, config: &WorkerConfig) -> Self {
        Self {
            catalog,
            store,
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
            reconcile_interval: Duration::from_secs(config.reconcile_interval_secs.max(1)),
            reconcile_grace: Duration::from_secs(config.reconcile_grace_secs),
        }
    }

    /// Run both passes on their intervals until `shutdown` is cancelled.
    ///
    /// Each interval fires immediately, so both passes run once at startup. A pass
    /// that has started always runs to completion.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            cleanup_interval_secs = self.cleanup_interval.as_secs(),
            reconcile_interval_secs = self.reconcile_interval.as_secs(),
            "Starting maintenance worker"
        );

        let mut cleanup = tokio::time::interval(self.cleanup_interval);
        let mut reconcile = tokio::time::interval(self.reconcile_interval);
        cleanup.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        reconcile.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = cleanup.tick() => {
                    if let Err(e) = self.cleanup().await {
                        error!(error = %e, "Expiry sweep failed");
                    }
                }
                _ = reconcile.tick() => {
                    if let Err(e) = self.reconcile().await {
                        error!(error = %e, "Reconciliation failed");
                    }
                }
            }
        }

        info!("Maintenance worker stopped");
    }
}
