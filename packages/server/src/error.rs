use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::services::ServiceError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NO_FILE`, `READ_ERROR`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`, `EXPIRED`,
    /// `CONFLICT`, `PAYLOAD_TOO_LARGE`, `QUOTA_EXCEEDED`, `STORAGE_ERROR`,
    /// `CATALOG_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "custom code must be between 4 and 30 characters, got 2")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NoFile,
    ReadError(String),
    TokenMissing,
    TokenInvalid,
    PermissionDenied,
    NotFound(String),
    Expired(String),
    Conflict(String),
    PayloadTooLarge(String),
    QuotaExceeded(String),
    Storage(String),
    Catalog(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NoFile => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "NO_FILE",
                    message: "No file was provided".into(),
                },
            ),
            AppError::ReadError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "READ_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid, revoked or expired token".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "You do not own this resource".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Expired(msg) => (
                StatusCode::GONE,
                ErrorBody {
                    code: "EXPIRED",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: msg,
                },
            ),
            AppError::QuotaExceeded(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "QUOTA_EXCEEDED",
                    message: msg,
                },
            ),
            AppError::Storage(detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STORAGE_ERROR",
                        message: "Storage backend failure".into(),
                    },
                )
            }
            AppError::Catalog(detail) => {
                tracing::error!("Catalog error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "CATALOG_ERROR",
                        message: "Catalog failure".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(msg) => AppError::Validation(msg),
            ServiceError::NoFile => AppError::NoFile,
            ServiceError::ReadError(msg) => AppError::ReadError(msg),
            ServiceError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            ServiceError::Expired(what) => AppError::Expired(format!("{what} has expired")),
            ServiceError::Unauthorized => AppError::PermissionDenied,
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::PayloadTooLarge(msg) => AppError::PayloadTooLarge(msg),
            ServiceError::QuotaExceeded(msg) => AppError::QuotaExceeded(msg),
            ServiceError::Storage(e) => AppError::Storage(e.to_string()),
            ServiceError::Catalog(e) => AppError::Catalog(e.to_string()),
            ServiceError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
