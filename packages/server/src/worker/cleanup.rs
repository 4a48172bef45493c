use tracing::{error, info};

use super::Worker;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub items_deleted: u64,
    pub items_failed: u64,
    pub urls_expired: u64,
}

impl Worker {
    /// Delete expired uploads (blob, then row) and deactivate overdue short URLs.
    ///
    /// A failing item is logged and skipped; its row stays so the next pass retries it.
    pub async fn cleanup(&self) -> anyhow::Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for item in self.catalog.expired_items().await? {
            if let Err(e) = self.store.delete(&item.blob_key).await {
                error!(reference = %item.reference, blob_key = %item.blob_key, error = %e, "Failed to delete expired blob");
                report.items_failed += 1;
                continue;
            }
            match self.catalog.delete_item(item.id).await {
                Ok(_) => report.items_deleted += 1,
                Err(e) => {
                    error!(reference = %item.reference, error = %e, "Failed to delete expired item row");
                    report.items_failed += 1;
                }
            }
        }

        report.urls_expired = self.catalog.expire_overdue_urls().await?;

        if report != CleanupReport::default() {
            info!(
                items_deleted = report.items_deleted,
                items_failed = report.items_failed,
                urls_expired = report.urls_expired,
                "Expiry sweep finished"
            );
        }
        Ok(report)
    }
}
