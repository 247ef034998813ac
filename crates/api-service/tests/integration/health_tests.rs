//! Tests for the operational endpoints: `/`, `/health`, `/ready`, `/metrics`.

use api_test_utils::{TestApiServer, TestServerOptions};
use reqwest::StatusCode;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_index_returns_service_name(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;

    let response = server.client().get(format!("{}/", server.url())).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["message"], "user-api");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_needs_no_token(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;

    let response = server
        .client()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_when_dependencies_healthy(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;

    let response = server
        .client()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["token_store"], "healthy");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_not_ready_when_token_store_down(pool: PgPool) -> Result<(), anyhow::Error> {
    let server =
        TestApiServer::spawn_with(pool, TestServerOptions::default().with_failing_store()).await?;

    let response = server
        .client()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["token_store"], "unhealthy");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_not_ready_when_database_closed(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestApiServer::spawn(pool.clone()).await?;

    // Act
    pool.close().await;
    let response = server
        .client()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["database"], "unhealthy");

    // Liveness is unaffected
    let response = server
        .client()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_metrics_endpoint_is_public(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;

    let response = server
        .client()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_route_is_404(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestApiServer::spawn(pool).await?;

    let response = server
        .client()
        .get(format!("{}/nope", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
