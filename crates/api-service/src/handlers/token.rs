//! Token issuance endpoint.

use crate::auth::AuthService;
use crate::errors::ApiError;
use crate::models::TokenResponse;
use axum::extract::{Request, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /token
///
/// Runs the issuance validator chain, signs a token and records it in the
/// token store.
///
/// # Response
///
/// ```json
/// {"success": true, "token": "eyJhbGciOiJSUzUxMiIs..."}
/// ```
///
/// - 401 when the validator chain refuses the request (enforcing only)
/// - 500 when signing fails (enforcing only) or the token store is unavailable
#[instrument(skip_all, name = "api.token.issue")]
pub async fn issue_token(
    State(auth): State<Arc<AuthService>>,
    request: Request,
) -> Result<Json<TokenResponse>, ApiError> {
    let (parts, _body) = request.into_parts();
    let response = auth.issue_token(&parts).await?;
    Ok(Json(response))
}
