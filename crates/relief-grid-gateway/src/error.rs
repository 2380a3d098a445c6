//! API error types and responses.
//!
//! This module defines the standard error format for all API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use relief_grid_core::geo::GeoError;
use relief_grid_hub::HubError;
use relief_grid_ledger::LedgerError;
use relief_grid_store::StoreError;

use crate::auth::AuthError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid authentication token.
    #[error("unauthorized")]
    Unauthorized,

    /// The authenticated role does not permit this action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The durable store could not complete the request in time.
    #[error("store unavailable")]
    StoreUnavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::StoreUnavailable => "store_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "Token rejected");
        Self::Unauthorized
    }
}

impl From<GeoError> for ApiError {
    fn from(err: GeoError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::EmptyMessage => Self::BadRequest("message content is empty".to_string()),
            HubError::Persistence(msg) => {
                tracing::error!(error = %msg, "Durable append failed");
                Self::StoreUnavailable
            }
            HubError::Internal(msg) => {
                tracing::error!(error = %msg, "Hub internal error");
                Self::Internal("message hub error".to_string())
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unauthorized { .. } => Self::Forbidden(err.to_string()),
            LedgerError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            LedgerError::OutOfRange { .. } => Self::BadRequest(err.to_string()),
            LedgerError::TaskNotFound(id) => Self::NotFound(format!("task {id}")),
            LedgerError::ResourceNotFound(id) => Self::NotFound(format!("resource {id}")),
            LedgerError::Store(store_err) => Self::from(store_err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("record".to_string()),
            other => {
                tracing::error!(error = %other, "Store error");
                Self::Internal("storage error".to_string())
            }
        }
    }
}
