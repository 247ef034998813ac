//! HTTP middleware.

pub mod auth;
pub mod http_metrics;

pub use auth::{
    extract_token, require_valid_token, AuthenticatedToken, RequireTokenState, TokenExt,
};
pub use http_metrics::http_metrics_middleware;
