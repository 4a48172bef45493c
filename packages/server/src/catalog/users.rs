use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use super::{Catalog, CatalogError, classify};
use crate::entity::user;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_verifier: String,
}

impl Catalog {
    /// Taken usernames or emails are [`CatalogError::Duplicate`].
    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model, CatalogError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            email: Set(new_user.email),
            username: Set(new_user.username),
            password_verifier: Set(new_user.password_verifier),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(classify)
    }

    pub async fn user_by_id(&self, id: i32) -> Result<Option<user::Model>, CatalogError> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<user::Model>, CatalogError> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<user::Model>, CatalogError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    /// Persist changes to an existing user, bumping `updated_at`.
    pub async fn update_user(&self, mut user: user::ActiveModel) -> Result<user::Model, CatalogError> {
        user.updated_at = Set(Utc::now());
        user.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => CatalogError::NotFound,
            other => classify(other),
        })
    }

    pub async fn set_user_active(&self, id: i32, active: bool) -> Result<(), CatalogError> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Active, Expr::value(active))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    /// Cascades to the user's URLs and tokens; their uploads are orphaned, not deleted.
    pub async fn delete_user(&self, id: i32) -> Result<bool, CatalogError> {
        let result = user::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
