//! E2E tests for the `/users` resource.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<feature>_<scenario>_<expected_result>`

use api_test_utils::{HookKind, TestApiServer, TestServerOptions};
use reqwest::StatusCode;
use serde_json::json;
use sqlx::PgPool;

async fn create_user(
    server: &TestApiServer,
    token: &str,
    email: &str,
    password: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(server
        .client()
        .post(format!("{}/users", server.url()))
        .bearer_auth(token)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?)
}

// ============================================================================
// CRUD
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_crud_happy_path(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestApiServer::spawn(pool).await?;
    let token = server.issue_token().await?;

    // Create
    let response = create_user(&server, &token, "alice@example.com", "password123").await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: serde_json::Value = response.json().await?;
    let id = created["id"].as_i64().ok_or_else(|| anyhow::anyhow!("id missing"))?;
    assert_eq!(created["email"], "alice@example.com");
    assert!(created.get("password_hash").is_none());

    // Get
    let response = server
        .client()
        .get(format!("{}/users/{id}", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: serde_json::Value = response.json().await?;
    assert_eq!(fetched["email"], "alice@example.com");

    // Update
    let response = server
        .client()
        .put(format!("{}/users/{id}", server.url()))
        .bearer_auth(&token)
        .json(&json!({ "email": "alice@new.example.com", "password": "new-password" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // List
    let response = server
        .client()
        .get(format!("{}/users", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<serde_json::Value> = response.json().await?;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "alice@new.example.com");

    // Delete
    let response = server
        .client()
        .delete(format!("{}/users/{id}", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client()
        .get(format!("{}/users/{id}", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_list_empty_is_ok(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;
    let token = server.issue_token().await?;

    let response = server
        .client()
        .get(format!("{}/users", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<serde_json::Value> = response.json().await?;
    assert!(users.is_empty());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_stores_bcrypt_hash(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;
    let token = server.issue_token().await?;

    create_user(&server, &token, "bob@example.com", "plain-text").await?;

    let (hash,): (String,) =
        sqlx::query_as("SELECT password_hash FROM users WHERE email = 'bob@example.com'")
            .fetch_one(server.pool())
            .await?;
    assert!(hash.starts_with("$2"));
    assert_ne!(hash, "plain-text");
    Ok(())
}

// ============================================================================
// Validation
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_invalid_payload_is_400(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;
    let token = server.issue_token().await?;

    let bad_email = create_user(&server, &token, "not-an-email", "pw").await?;
    let empty_password = create_user(&server, &token, "carol@example.com", "").await?;

    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    assert_eq!(empty_password.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_duplicate_email_is_409(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;
    let token = server.issue_token().await?;

    create_user(&server, &token, "dave@example.com", "pw").await?;
    let response = create_user(&server, &token, "dave@example.com", "pw2").await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_unknown_id_is_404(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;
    let token = server.issue_token().await?;

    for request in [
        server.client().get(format!("{}/users/4242", server.url())),
        server.client().delete(format!("{}/users/4242", server.url())),
        server
            .client()
            .put(format!("{}/users/4242", server.url()))
            .json(&json!({ "email": "x@example.com", "password": "pw" })),
    ] {
        let response = request.bearer_auth(&token).send().await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    Ok(())
}

// ============================================================================
// Authentication
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_without_token_is_401(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;

    let response = server
        .client()
        .get(format!("{}/users", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("www-authenticate"));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error_code"], "MISSING_TOKEN");
    assert_eq!(server.hooks().calls_of(HookKind::Abort).len(), 1);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_users_observe_mode_serves_without_token(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn_with(pool, TestServerOptions::default().observe()).await?;

    let response = server
        .client()
        .get(format!("{}/users", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.hooks().calls_of(HookKind::Continue).len(), 1);
    Ok(())
}
