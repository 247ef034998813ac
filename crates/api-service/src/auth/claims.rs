//! Token claims.

use chrono::{DateTime, TimeZone, Utc};
use common::jwt::{validate_iat_at, DEFAULT_CLOCK_SKEW};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a correctly signed claim set was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("token is expired")]
    Expired,

    #[error("token used before issued")]
    IssuedInFuture,

    #[error("unexpected issuer")]
    WrongIssuer,
}

/// Claims carried by every issued token.
///
/// `id` is the legacy subject claim; it is optional and redacted in Debug
/// output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer.
    pub iss: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject identifier.
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub subject: Option<i64>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("subject", &self.subject.map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Claims {
    /// Claims for a token issued by `issuer` at `now`, living `ttl_seconds`.
    pub fn issued_at(issuer: &str, now: DateTime<Utc>, ttl_seconds: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            exp: now.timestamp() + ttl_seconds,
            iat: Some(now.timestamp()),
            subject: None,
        }
    }

    /// Absolute expiry instant.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Check time-based claims at `now` and, when given, the issuer.
    ///
    /// A token is expired once `now` is strictly past `exp`.
    pub fn validate(&self, now: DateTime<Utc>, expected_issuer: Option<&str>) -> Result<(), ClaimsError> {
        let now = now.timestamp();

        if now > self.exp {
            return Err(ClaimsError::Expired);
        }

        if let Some(iat) = self.iat {
            validate_iat_at(iat, DEFAULT_CLOCK_SKEW, now)
                .map_err(|_| ClaimsError::IssuedInFuture)?;
        }

        match expected_issuer {
            Some(issuer) if issuer != self.iss => Err(ClaimsError::WrongIssuer),
            _ => Ok(()),
        }
    }
}
