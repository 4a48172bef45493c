use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use tracing::{info, warn};

use crate::catalog::{Catalog, NewUser};
use crate::config::BootstrapConfig;
use crate::entity::{click_event, shortened_url, uploaded_item};
use crate::services::TokenService;

/// `password_verifier` of accounts that cannot log in with a password.
pub const NO_PASSWORD: &str = "!";

/// Name of the token issued to the bootstrap account.
pub const BOOTSTRAP_TOKEN_NAME: &str = "bootstrap";

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup. Failures are logged, not fatal.
pub async fn ensure_indexes(db: &DatabaseConnection) {
    let indexes = [
        // Owner listings, newest first.
        (
            "idx_uploaded_item_owner_created",
            Index::create()
                .if_not_exists()
                .name("idx_uploaded_item_owner_created")
                .table(uploaded_item::Entity)
                .col(uploaded_item::Column::OwnerId)
                .col(uploaded_item::Column::CreatedAt)
                .to_owned(),
        ),
        // Expiry sweep.
        (
            "idx_uploaded_item_expires",
            Index::create()
                .if_not_exists()
                .name("idx_uploaded_item_expires")
                .table(uploaded_item::Entity)
                .col(uploaded_item::Column::ExpiresAt)
                .to_owned(),
        ),
        // Per-URL analytics.
        (
            "idx_click_event_url_clicked",
            Index::create()
                .if_not_exists()
                .name("idx_click_event_url_clicked")
                .table(click_event::Entity)
                .col(click_event::Column::UrlId)
                .col(click_event::Column::ClickedAt)
                .to_owned(),
        ),
        (
            "idx_shortened_url_owner_created",
            Index::create()
                .if_not_exists()
                .name("idx_shortened_url_owner_created")
                .table(shortened_url::Entity)
                .col(shortened_url::Column::OwnerId)
                .col(shortened_url::Column::CreatedAt)
                .to_owned(),
        ),
    ];

    let backend = db.get_database_backend();
    for (name, index) in &indexes {
        match db.execute_unprepared(&render(backend, index)).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }
}

fn render(backend: DatabaseBackend, index: &IndexCreateStatement) -> String {
    match backend {
        DatabaseBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        DatabaseBackend::MySql => index.to_string(MysqlQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    }
}

/// Create the configured bootstrap account and its first API token.
///
/// Does nothing unless both username and email are set, or when the user exists.
/// Returns the plain token when one was issued.
pub async fn bootstrap_user(
    catalog: &Catalog,
    tokens: &TokenService,
    config: &BootstrapConfig,
) -> anyhow::Result<Option<String>> {
    let (Some(username), Some(email)) = (config.username.as_deref(), config.email.as_deref())
    else {
        return Ok(None);
    };
    let (username, email) = (username.trim(), email.trim());
    if username.is_empty() || email.is_empty() {
        return Ok(None);
    }

    if catalog.user_by_username(username).await?.is_some() {
        return Ok(None);
    }

    let user = catalog
        .create_user(NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_verifier: NO_PASSWORD.to_string(),
        })
        .await?;

    let issued = tokens.issue(user.id, BOOTSTRAP_TOKEN_NAME, None).await?;
    info!(
        username = %user.username,
        token = %issued.value,
        "Created bootstrap user; store this token, it is not shown again"
    );
    Ok(Some(issued.value))
}
