//! User CRUD endpoints.

use crate::crypto;
use crate::errors::ApiError;
use crate::models::{UserRequest, UserResponse};
use crate::repositories::users;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /users
#[instrument(skip_all, name = "api.users.list")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = users::list_all(&state.pool).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Handler for GET /users/:id
#[instrument(skip_all, name = "api.users.get", fields(user_id = id))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user".to_string()))?;

    Ok(Json(user.into()))
}

/// Handler for POST /users
#[instrument(skip_all, name = "api.users.create")]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_user_request(&request)?;

    let hash = crypto::hash_password(request.password.expose_secret(), state.config.bcrypt_cost)?;
    let user = users::insert(&state.pool, request.email.trim(), &hash).await?;

    tracing::info!(target: "api.users", user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Handler for PUT /users/:id
#[instrument(skip_all, name = "api.users.update", fields(user_id = id))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UserRequest>,
) -> Result<StatusCode, ApiError> {
    validate_user_request(&request)?;

    let hash = crypto::hash_password(request.password.expose_secret(), state.config.bcrypt_cost)?;
    users::update(&state.pool, id, request.email.trim(), &hash)
        .await?
        .ok_or_else(|| ApiError::NotFound("user".to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /users/:id
#[instrument(skip_all, name = "api.users.delete", fields(user_id = id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if users::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("user".to_string()))
    }
}

fn validate_user_request(request: &UserRequest) -> Result<(), ApiError> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email".to_string()));
    }
    if request.password.expose_secret().is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }
    Ok(())
}
