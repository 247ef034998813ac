use crate::auth::claims::ClaimsError;
use crate::auth::store::StoreError;
use thiserror::Error;

/// Failures inside the token authentication service.
///
/// Display strings are for logs only. Clients see [`AuthError::code`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request rejected by validator chain: {0}")]
    ValidationRejected(String),

    #[error("failed to sign token: {0}")]
    SigningFailed(String),

    #[error("failed to record issued token: {0}")]
    CacheWriteFailed(#[from] StoreError),

    #[error("no token in request")]
    MissingToken,

    #[error("parse jwt: {0}")]
    MalformedToken(String),

    #[error("invalid claims: {0}")]
    ExpiredOrInvalidClaims(#[from] ClaimsError),
}

impl AuthError {
    /// Stable code rendered in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::ValidationRejected(_) => "NOT_AUTHORIZED",
            AuthError::SigningFailed(_) => "TOKEN_GENERATION_FAILED",
            AuthError::CacheWriteFailed(_) => "TOKEN_STORE_UNAVAILABLE",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::MalformedToken(_) => "INVALID_TOKEN",
            AuthError::ExpiredOrInvalidClaims(_) => "INVALID_CLAIMS",
        }
    }

    /// Bounded label for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            AuthError::ValidationRejected(_) => "validation_rejected",
            AuthError::SigningFailed(_) => "signing_failed",
            AuthError::CacheWriteFailed(_) => "cache_write_failed",
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::ExpiredOrInvalidClaims(ClaimsError::Expired) => "expired",
            AuthError::ExpiredOrInvalidClaims(_) => "invalid_claims",
        }
    }
}
