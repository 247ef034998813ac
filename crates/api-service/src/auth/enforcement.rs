//! Enforcement policy: what happens when an auth check fails.
//!
//! The `enforce` flag selects one of two behaviors, once, when a middleware
//! or service is built:
//!
//! - [`Enforcer::Abort`]: the request ends with the response produced by
//!   [`EnforcementHooks::abort_request`].
//! - [`Enforcer::Continue`]: [`EnforcementHooks::continue_request`] is
//!   notified and the request proceeds unauthenticated.
//!
//! Issuance failures are reported to [`EnforcementHooks::token_blocked`]
//! before the same flag decides whether the issuance stops.

use crate::auth::error::AuthError;
use crate::errors::coded_error_response;
use crate::observability::metrics;
use axum::http::{request::Parts, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use tracing::{info, warn};

/// Callbacks invoked on auth failures.
///
/// Telemetry and response rendering live here so the auth state machine
/// does not change when reporting does.
pub trait EnforcementHooks: Send + Sync {
    /// Render the response for an aborted request.
    fn abort_request(&self, request: &Parts, error: &AuthError, status: StatusCode) -> Response;

    /// Observe a failure that is allowed through.
    fn continue_request(&self, request: &Parts, error: &AuthError, status: StatusCode);

    /// Observe a refused or failed token issuance.
    fn token_blocked(&self, request: &Parts, error: &AuthError, status: StatusCode);
}

/// Default hooks: structured logs, metrics and the JSON error envelope.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHooks;

impl EnforcementHooks for TracingHooks {
    fn abort_request(&self, request: &Parts, error: &AuthError, status: StatusCode) -> Response {
        warn!(
            target: "api.auth.enforcement",
            method = %request.method,
            path = %request.uri.path(),
            status = status.as_u16(),
            error = %error,
            "Request aborted"
        );
        metrics::record_token_validation("aborted", Some(error.category()));
        coded_error_response(status, Some(error.code()))
    }

    fn continue_request(&self, request: &Parts, error: &AuthError, status: StatusCode) {
        info!(
            target: "api.auth.enforcement",
            method = %request.method,
            path = %request.uri.path(),
            status = status.as_u16(),
            error = %error,
            "Auth failure observed, request continues"
        );
        metrics::record_token_validation("observed", Some(error.category()));
    }

    fn token_blocked(&self, request: &Parts, error: &AuthError, status: StatusCode) {
        warn!(
            target: "api.auth.enforcement",
            method = %request.method,
            path = %request.uri.path(),
            status = status.as_u16(),
            error = %error,
            "Token issuance blocked"
        );
        metrics::record_token_issuance("blocked", Some(error.category()));
    }
}

/// Outcome of applying the policy to one failure.
pub enum Decision {
    /// Stop with this response.
    Abort(Response),
    /// Proceed without an authenticated identity.
    Continue,
}

/// Verification failure policy, selected from the `enforce` flag.
#[derive(Clone)]
pub enum Enforcer {
    Abort(Arc<dyn EnforcementHooks>),
    Continue(Arc<dyn EnforcementHooks>),
}

impl std::fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Enforcer::Abort(_) => f.write_str("Enforcer::Abort"),
            Enforcer::Continue(_) => f.write_str("Enforcer::Continue"),
        }
    }
}

impl Enforcer {
    pub fn from_flag(enforce: bool, hooks: Arc<dyn EnforcementHooks>) -> Self {
        if enforce {
            Enforcer::Abort(hooks)
        } else {
            Enforcer::Continue(hooks)
        }
    }

    pub fn is_enforcing(&self) -> bool {
        matches!(self, Enforcer::Abort(_))
    }

    /// Apply the policy to a failed check.
    pub fn reject(&self, request: &Parts, error: &AuthError, status: StatusCode) -> Decision {
        match self {
            Enforcer::Abort(hooks) => Decision::Abort(hooks.abort_request(request, error, status)),
            Enforcer::Continue(hooks) => {
                hooks.continue_request(request, error, status);
                Decision::Continue
            }
        }
    }
}
