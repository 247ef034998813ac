//! User repository.
//!
//! Lookups return `Ok(None)` (or `Ok(false)` for deletes) when no row
//! matches, so a missing user is never confused with a database failure.

use crate::errors::ApiError;
use crate::models::User;
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, email, password_hash, created_at, updated_at";

/// Get user by email.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::Database(format!("Failed to fetch user by email: {e}")))?;

    Ok(user)
}

/// Get user by id.
pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::Database(format!("Failed to fetch user by id: {e}")))?;

    Ok(user)
}

/// All users, ordered by id.
pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, ApiError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY id"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::Database(format!("Failed to list users: {e}")))?;

    Ok(users)
}

/// Insert a user. `password_hash` must already be hashed.
///
/// A duplicate email maps to `Conflict`.
pub async fn insert(pool: &PgPool, email: &str, password_hash: &str) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(map_write_error)
}

/// Replace a user's email and password hash.
pub async fn update(
    pool: &PgPool,
    id: i64,
    email: &str,
    password_hash: &str,
) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET email = $2, password_hash = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await
    .map_err(map_write_error)
}

/// Delete a user. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::Database(format!("Failed to delete user: {e}")))?;

    Ok(result.rows_affected() > 0)
}

fn map_write_error(e: sqlx::Error) -> ApiError {
    let is_duplicate = e
        .as_database_error()
        .and_then(|db| db.constraint())
        .is_some_and(|c| c == "users_email_unique");

    if is_duplicate {
        ApiError::Conflict("email already exists".to_string())
    } else {
        ApiError::Database(format!("Failed to write user: {e}"))
    }
}
