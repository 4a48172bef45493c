//! Authoritative index of users, uploads, short URLs, clicks and API tokens.
//!
//! The catalog owns row lifecycles only; blob bytes belong to the storage
//! backend and are linked by key.

mod tokens;
pub mod tx;
mod uploads;
mod urls;
mod users;

use sea_orm::{DatabaseConnection, DbErr, SqlErr};

pub use tokens::NewToken;
pub use uploads::{ItemStats, MimeCount, NewItem};
pub use urls::{DayCount, KeyCount, NewShortUrl, UrlAnalytics, UrlLookup};
pub use users::NewUser;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("reference is already taken")]
    DuplicateReference,
    #[error("duplicate value: {0}")]
    Duplicate(String),
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Map a unique-constraint violation to [`CatalogError::Duplicate`].
pub(crate) fn classify(err: DbErr) -> CatalogError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => CatalogError::Duplicate(detail),
        _ => CatalogError::Database(err),
    }
}

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}
