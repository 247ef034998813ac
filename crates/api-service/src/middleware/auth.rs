//! Token authentication middleware for protected routes.
//!
//! Looks for a token in the `token` query parameter, then in the
//! `Authorization` header, verifies it, and attaches the raw token to the
//! request extensions for handlers.
//!
//! # Token Sources
//!
//! ```text
//! GET /users?token=<token>
//! Authorization: Bearer <token>
//! Authorization: Basic xxx, Bearer <token>
//! ```
//!
//! When the header carries several comma-separated credentials, the first
//! `Bearer` entry wins.

use crate::auth::{AuthError, AuthService, Decision, Enforcer};
use axum::{
    extract::{Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Raw bearer token of an authenticated request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedToken(String);

impl AuthenticatedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthenticatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthenticatedToken([REDACTED])")
    }
}

/// State for the token middleware.
///
/// The enforcement policy is chosen when this is built, so changing the
/// `enforce` flag means rebuilding the service and its routes.
#[derive(Clone)]
pub struct RequireTokenState {
    auth: Arc<AuthService>,
    enforcer: Enforcer,
}

impl RequireTokenState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        let enforcer = auth.enforcer();
        Self { auth, enforcer }
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforcer.is_enforcing()
    }
}

/// Find the candidate token on a request.
///
/// The first `token` query parameter, then the first `Bearer` credential
/// in `Authorization`. Empty values count as absent.
pub fn extract_token(request: &Parts) -> Option<String> {
    let from_query = request
        .uri
        .query()
        .and_then(|query| serde_urlencoded::from_str::<Vec<(String, String)>>(query).ok())
        .and_then(|pairs| pairs.into_iter().find(|(key, _)| key == "token"))
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty());

    if from_query.is_some() {
        return from_query;
    }

    request
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| {
            value
                .split(',')
                .map(str::trim)
                .find_map(|part| part.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}

/// Middleware that requires a valid token.
///
/// # Response
///
/// - Enforcing: 401 with the JSON error envelope and a `WWW-Authenticate`
///   header when the token is missing or invalid
/// - Observing: failures are reported and the request continues without
///   an [`AuthenticatedToken`]
/// - Valid token: continues with the token in extensions
#[instrument(skip_all, name = "api.middleware.auth")]
pub async fn require_valid_token(
    State(state): State<Arc<RequireTokenState>>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    match authenticate(&state.auth, &parts) {
        Ok(token) => {
            parts.extensions.insert(token);
        }
        Err(err) => {
            tracing::debug!(target: "api.middleware.auth", error = %err, "Token check failed");
            if let Decision::Abort(response) =
                state.enforcer.reject(&parts, &err, StatusCode::UNAUTHORIZED)
            {
                return response;
            }
        }
    }

    next.run(Request::from_parts(parts, body)).await
}

fn authenticate(auth: &AuthService, parts: &Parts) -> Result<AuthenticatedToken, AuthError> {
    let token = extract_token(parts).ok_or(AuthError::MissingToken)?;
    let claims = auth.verify_token(&token)?;

    tracing::info!(
        target: "api.middleware.auth",
        expires_at = claims.exp,
        "Token authenticated"
    );
    crate::observability::metrics::record_token_validation("success", None);

    Ok(AuthenticatedToken(token))
}

/// Extension trait for reading the authenticated token from a request.
pub trait TokenExt {
    /// Returns `None` when the middleware was not applied or let an
    /// unauthenticated request through.
    fn authenticated_token(&self) -> Option<&AuthenticatedToken>;
}

impl<B> TokenExt for axum::http::Request<B> {
    fn authenticated_token(&self) -> Option<&AuthenticatedToken> {
        self.extensions().get::<AuthenticatedToken>()
    }
}

impl TokenExt for Parts {
    fn authenticated_token(&self) -> Option<&AuthenticatedToken> {
        self.extensions.get::<AuthenticatedToken>()
    }
}
