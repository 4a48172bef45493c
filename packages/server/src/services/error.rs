use common::storage::StorageError;

use crate::catalog::CatalogError;
use crate::quota::AdmissionError;
use crate::reference::ReferenceError;

/// Errors surfaced by the service layer. The HTTP layer maps each variant to a status.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} has expired")]
    Expired(&'static str),
    #[error("not permitted")]
    Unauthorized,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    QuotaExceeded(String),
    #[error("no file was provided")]
    NoFile,
    #[error("{0}")]
    ReadError(String),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("catalog: {0}")]
    Catalog(CatalogError),
    #[error("{0}")]
    Internal(String),
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => ServiceError::NotFound("record"),
            other => ServiceError::Catalog(other),
        }
    }
}

impl From<AdmissionError> for ServiceError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::PayloadTooLarge { .. } => ServiceError::PayloadTooLarge(err.to_string()),
            AdmissionError::QuotaExceeded { .. } => ServiceError::QuotaExceeded(err.to_string()),
            AdmissionError::NoFile => ServiceError::NoFile,
            AdmissionError::ReadError(detail) => ServiceError::ReadError(detail),
        }
    }
}

impl From<ReferenceError> for ServiceError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::InvalidStyle(_) => ServiceError::InvalidInput(err.to_string()),
            ReferenceError::CollisionExhausted(_) => ServiceError::Conflict(err.to_string()),
            ReferenceError::Entropy(_) => ServiceError::Internal(err.to_string()),
        }
    }
}
