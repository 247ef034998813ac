//! HTTP error types.
//!
//! Every error leaves the service as the same JSON envelope:
//!
//! ```json
//! {"error": "Unauthorized", "error_code": "MISSING_TOKEN", "status": 401}
//! ```
//!
//! `error` is the canonical status text, `error_code` is an optional stable
//! code and `status` repeats the HTTP status. Internal error strings are
//! logged server-side and never rendered.

use crate::auth::AuthError;
use crate::crypto::CryptoError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value of the `WWW-Authenticate` header on 401 responses.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"user-api\", error=\"invalid_token\"";

/// API error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401
/// - BadRequest: 400
/// - NotFound: 404
/// - Conflict: 409
/// - ServiceUnavailable: 503
/// - Database, TokenStore, Internal: 500
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Token store error: {0}")]
    TokenStore(String),

    #[error("Internal server error: {0}")]
    Internal(&'static str),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::TokenStore(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Code rendered in `error_code`, if any.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(code) | ApiError::Internal(code) => Some(*code),
            ApiError::BadRequest(reason) | ApiError::Conflict(reason) => Some(reason.as_str()),
            ApiError::NotFound(_) => Some("NOT_FOUND"),
            ApiError::ServiceUnavailable(_) => Some("SERVICE_UNAVAILABLE"),
            ApiError::TokenStore(_) => Some("TOKEN_STORE_UNAVAILABLE"),
            ApiError::Database(_) => None,
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Canonical HTTP status text.
    pub error: String,

    /// Stable machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// HTTP status code.
    pub status: u16,
}

/// Render the error envelope for `status` with an optional code.
///
/// 401 responses also carry a `WWW-Authenticate` challenge.
pub fn coded_error_response(status: StatusCode, code: Option<&str>) -> Response {
    let body = ErrorResponse {
        error: status.canonical_reason().unwrap_or("Unknown").to_string(),
        error_code: code.map(ToString::to_string),
        status: status.as_u16(),
    };

    let mut response = (status, Json(body)).into_response();

    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
        );
    }

    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(err) => {
                tracing::error!(target: "api.database", error = %err, "Database operation failed");
            }
            ApiError::TokenStore(err) => {
                tracing::error!(target: "api.store", error = %err, "Token store operation failed");
            }
            ApiError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "api.availability", reason = %reason, "Service unavailable");
            }
            _ => {}
        }

        coded_error_response(self.status_code(), self.error_code())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        tracing::error!(target: "api.crypto", error = %err, "Crypto operation failed");
        match err {
            CryptoError::PasswordHash(_) => ApiError::Internal("PASSWORD_HASH_FAILED"),
            CryptoError::KeyLoad { .. } | CryptoError::InvalidKey(_) => {
                ApiError::Internal("INVALID_SIGNING_KEY")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ValidationRejected(_)
            | AuthError::MissingToken
            | AuthError::MalformedToken(_)
            | AuthError::ExpiredOrInvalidClaims(_) => ApiError::Unauthorized(err.code()),
            AuthError::CacheWriteFailed(store_err) => ApiError::TokenStore(store_err.to_string()),
            AuthError::SigningFailed(_) => ApiError::Internal(err.code()),
        }
    }
}
