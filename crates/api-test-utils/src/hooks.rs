//! Enforcement hooks that record their calls
//!
//! Lets tests assert which hook fired, with which error code and status,
//! without scraping logs.

use api_service::auth::{AuthError, EnforcementHooks};
use api_service::errors::coded_error_response;
use axum::http::{request::Parts, StatusCode};
use axum::response::Response;
use std::sync::Mutex;

/// Which hook was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Abort,
    Continue,
    TokenBlocked,
}

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCall {
    pub kind: HookKind,
    pub path: String,
    pub code: &'static str,
    pub status: StatusCode,
}

/// [`EnforcementHooks`] that remember every call.
///
/// `abort_request` renders the same coded error envelope as the production
/// hooks.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    calls: Mutex<Vec<HookCall>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls of one kind.
    pub fn calls_of(&self, kind: HookKind) -> Vec<HookCall> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    fn record(&self, kind: HookKind, request: &Parts, error: &AuthError, status: StatusCode) {
        self.calls.lock().unwrap().push(HookCall {
            kind,
            path: request.uri.path().to_string(),
            code: error.code(),
            status,
        });
    }
}

impl EnforcementHooks for RecordingHooks {
    fn abort_request(&self, request: &Parts, error: &AuthError, status: StatusCode) -> Response {
        self.record(HookKind::Abort, request, error, status);
        coded_error_response(status, Some(error.code()))
    }

    fn continue_request(&self, request: &Parts, error: &AuthError, status: StatusCode) {
        self.record(HookKind::Continue, request, error, status);
    }

    fn token_blocked(&self, request: &Parts, error: &AuthError, status: StatusCode) {
        self.record(HookKind::TokenBlocked, request, error, status);
    }
}
