use std::collections::HashSet;

use chrono::Utc;
use tracing::{error, info, warn};

use super::Worker;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Blobs with no row, removed from storage.
    pub orphan_blobs_deleted: u64,
    /// Rows whose blob is gone, removed from the catalog.
    pub orphan_rows_deleted: u64,
    /// Row-less blobs inside the grace window.
    pub skipped_recent: u64,
    pub failures: u64,
}

impl Worker {
    /// Make storage and catalog agree.
    ///
    /// Catalog keys are read before storage is listed: a blob is always written before
    /// its row, so every listed row's blob must already be visible in the listing.
    pub async fn reconcile(&self) -> anyhow::Result<ReconcileReport> {
        let rows = self.catalog.all_item_keys().await?;
        let blobs = self.store.enumerate("").await?;

        let row_keys: HashSet<&str> = rows.iter().map(|(_, key)| key.as_str()).collect();
        let blob_keys: HashSet<&str> = blobs.iter().map(|b| b.name.as_str()).collect();
        let grace = chrono::Duration::from_std(self.reconcile_grace)?;
        let now = Utc::now();

        let mut report = ReconcileReport::default();

        for blob in blobs.iter().filter(|b| !row_keys.contains(b.name.as_str())) {
            let recent = !grace.is_zero() && blob.modified.is_none_or(|modified| now - modified < grace);
            if recent {
                report.skipped_recent += 1;
                continue;
            }
            match self.store.delete(&blob.name).await {
                Ok(_) => {
                    warn!(blob_key = %blob.name, "Deleted blob without catalog entry");
                    report.orphan_blobs_deleted += 1;
                }
                Err(e) => {
                    error!(blob_key = %blob.name, error = %e, "Failed to delete orphan blob");
                    report.failures += 1;
                }
            }
        }

        for (id, key) in rows.iter().filter(|(_, key)| !blob_keys.contains(key.as_str())) {
            // Confirm absence directly; listings can be stale.
            match self.store.exists(key).await {
                Ok(false) => {}
                Ok(true) => continue,
                Err(e) => {
                    error!(blob_key = %key, error = %e, "Failed to check blob");
                    report.failures += 1;
                    continue;
                }
            }
            match self.catalog.delete_item(*id).await {
                Ok(_) => {
                    warn!(item_id = %id, blob_key = %key, "Deleted catalog entry without blob");
                    report.orphan_rows_deleted += 1;
                }
                Err(e) => {
                    error!(item_id = %id, error = %e, "Failed to delete orphan row");
                    report.failures += 1;
                }
            }
        }

        info!(
            blobs = blobs.len(),
            rows = rows.len(),
            orphan_blobs_deleted = report.orphan_blobs_deleted,
            orphan_rows_deleted = report.orphan_rows_deleted,
            skipped_recent = report.skipped_recent,
            failures = report.failures,
            "Reconciliation finished"
        );
        Ok(report)
    }
}
