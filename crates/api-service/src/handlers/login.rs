//! Password login.

use crate::crypto;
use crate::errors::ApiError;
use crate::models::{LoginForm, MessageResponse};
use crate::repositories::users;
use crate::routes::AppState;
use axum::extract::State;
use axum::{Form, Json};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /auth/login
///
/// Form fields `email` and `password`.
///
/// - 400 `email does not exist` for an unknown email
/// - 400 `invalid email/password` for a wrong password
/// - 200 `{"message": "success"}` otherwise
#[instrument(skip_all, name = "api.auth.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = users::find_by_email(&state.pool, &form.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("email does not exist".to_string()))?;

    if !crypto::verify_password(form.password.expose_secret(), &user.password_hash)? {
        tracing::debug!(target: "api.auth.login", user_id = user.id, "Password mismatch");
        return Err(ApiError::BadRequest("invalid email/password".to_string()));
    }

    tracing::info!(target: "api.auth.login", user_id = user.id, "User logged in");
    Ok(Json(MessageResponse::new("success")))
}
