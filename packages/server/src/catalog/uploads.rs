use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::{Catalog, CatalogError, classify, tx};
use crate::entity::uploaded_item;

/// Row to insert for a freshly written blob.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub id: Uuid,
    pub owner_id: Option<i32>,
    pub original_name: String,
    pub blob_key: String,
    pub mime_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeCount {
    pub mime_type: String,
    pub count: u64,
}

/// Per-owner storage summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemStats {
    pub total_items: u64,
    pub total_size: u64,
    pub total_views: u64,
    /// At most five entries, most common first.
    pub top_mime_types: Vec<MimeCount>,
}

const TOP_MIME_TYPES: usize = 5;

impl Catalog {
    /// Insert `item` unless its reference is already taken.
    ///
    /// The existence check and the insert share one transaction; the unique
    /// index on `reference` catches writers that race past the check.
    pub async fn create_item_with_reference(
        &self,
        item: NewItem,
    ) -> Result<uploaded_item::Model, CatalogError> {
        tx::in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let taken = uploaded_item::Entity::find()
                    .filter(uploaded_item::Column::Reference.eq(&item.reference))
                    .count(txn)
                    .await?;
                if taken > 0 {
                    return Err(CatalogError::DuplicateReference);
                }

                let model = uploaded_item::ActiveModel {
                    id: Set(item.id),
                    owner_id: Set(item.owner_id),
                    original_name: Set(item.original_name),
                    blob_key: Set(item.blob_key),
                    mime_type: Set(item.mime_type),
                    size: Set(item.size),
                    created_at: Set(item.created_at),
                    last_accessed_at: Set(None),
                    access_count: Set(0),
                    expires_at: Set(item.expires_at),
                    reference: Set(item.reference),
                };

                model.insert(txn).await.map_err(|e| match classify(e) {
                    CatalogError::Duplicate(detail) if detail.contains("reference") => {
                        CatalogError::DuplicateReference
                    }
                    other => other,
                })
            })
        })
        .await
    }

    pub async fn item_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<uploaded_item::Model>, CatalogError> {
        Ok(uploaded_item::Entity::find()
            .filter(uploaded_item::Column::Reference.eq(reference))
            .one(&self.db)
            .await?)
    }

    pub async fn item_by_blob_key(
        &self,
        blob_key: &str,
    ) -> Result<Option<uploaded_item::Model>, CatalogError> {
        Ok(uploaded_item::Entity::find()
            .filter(uploaded_item::Column::BlobKey.eq(blob_key))
            .one(&self.db)
            .await?)
    }

    pub async fn item_by_id(&self, id: Uuid) -> Result<Option<uploaded_item::Model>, CatalogError> {
        Ok(uploaded_item::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// `access_count += 1` and `last_accessed_at = now` in a single statement.
    pub async fn increment_item_access(&self, id: Uuid) -> Result<(), CatalogError> {
        let result = uploaded_item::Entity::update_many()
            .col_expr(
                uploaded_item::Column::AccessCount,
                Expr::col(uploaded_item::Column::AccessCount).add(1),
            )
            .col_expr(
                uploaded_item::Column::LastAccessedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(uploaded_item::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    /// Newest first.
    pub async fn items_by_owner(
        &self,
        owner_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<uploaded_item::Model>, CatalogError> {
        Ok(uploaded_item::Entity::find()
            .filter(uploaded_item::Column::OwnerId.eq(owner_id))
            .order_by_desc(uploaded_item::Column::CreatedAt)
            .order_by_desc(uploaded_item::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?)
    }

    pub async fn count_items_by_owner(&self, owner_id: i32) -> Result<u64, CatalogError> {
        Ok(uploaded_item::Entity::find()
            .filter(uploaded_item::Column::OwnerId.eq(owner_id))
            .count(&self.db)
            .await?)
    }

    /// Items whose `expires_at` lies in the past.
    pub async fn expired_items(&self) -> Result<Vec<uploaded_item::Model>, CatalogError> {
        Ok(uploaded_item::Entity::find()
            .filter(uploaded_item::Column::ExpiresAt.lt(Utc::now()))
            .order_by_asc(uploaded_item::Column::ExpiresAt)
            .all(&self.db)
            .await?)
    }

    /// Every blob key referenced by a row, for reconciliation.
    pub async fn all_item_keys(&self) -> Result<Vec<(Uuid, String)>, CatalogError> {
        Ok(uploaded_item::Entity::find()
            .select_only()
            .column(uploaded_item::Column::Id)
            .column(uploaded_item::Column::BlobKey)
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    /// Returns `false` when no row had that id.
    pub async fn delete_item(&self, id: Uuid) -> Result<bool, CatalogError> {
        let result = uploaded_item::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn owner_stats(&self, owner_id: i32) -> Result<ItemStats, CatalogError> {
        let rows: Vec<(i64, String, i64)> = uploaded_item::Entity::find()
            .select_only()
            .column(uploaded_item::Column::Size)
            .column(uploaded_item::Column::MimeType)
            .column(uploaded_item::Column::AccessCount)
            .filter(uploaded_item::Column::OwnerId.eq(owner_id))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut stats = ItemStats {
            total_items: rows.len() as u64,
            ..Default::default()
        };
        let mut by_mime: HashMap<String, u64> = HashMap::new();

        for (size, mime_type, views) in rows {
            stats.total_size += u64::try_from(size).unwrap_or(0);
            stats.total_views += u64::try_from(views).unwrap_or(0);
            *by_mime.entry(mime_type).or_insert(0) += 1;
        }

        let mut mimes: Vec<MimeCount> = by_mime
            .into_iter()
            .map(|(mime_type, count)| MimeCount { mime_type, count })
            .collect();
        mimes.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.mime_type.cmp(&b.mime_type))
        });
        mimes.truncate(TOP_MIME_TYPES);
        stats.top_mime_types = mimes;

        Ok(stats)
    }
}
