//! Liveness, readiness and index endpoints.

use crate::models::{MessageResponse, ReadinessResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /
pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse::new("user-api"))
}

/// Liveness probe. Always "OK" while the process serves requests.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe.
///
/// Checks the database (`SELECT 1`) and the token store (`PING`).
///
/// ```json
/// {"status": "ready", "database": "healthy", "token_store": "healthy"}
/// ```
///
/// Returns 503 with the failing component marked `unhealthy` otherwise.
#[instrument(skip_all, name = "api.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let store_healthy = match state.auth.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target: "api.health", error = %e, "Token store ping failed");
            false
        }
    };

    let label = |healthy: bool| if healthy { "healthy" } else { "unhealthy" }.to_string();

    let ready = db_healthy && store_healthy;
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        database: label(db_healthy),
        token_store: label(store_healthy),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
