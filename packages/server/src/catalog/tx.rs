use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::warn;

use super::CatalogError;

/// Run `work` inside a transaction.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`. If `work`
/// panics the transaction is dropped, which rolls it back, and the panic keeps
/// unwinding. Transactions do not nest.
pub async fn in_transaction<T, F>(db: &DatabaseConnection, work: F) -> Result<T, CatalogError>
where
    T: Send,
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, CatalogError>>,
{
    let txn = db.begin().await?;

    match work(&txn).await {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                warn!(error = %rollback, "Transaction rollback failed");
            }
            Err(e)
        }
    }
}
