//! HTTP routes for the user API.
//!
//! Defines the Axum router and application state.

use crate::auth::AuthService;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_valid_token, RequireTokenState};
use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Per-request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long browsers may cache a CORS preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(1000);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Token issuance and verification.
    pub auth: Arc<AuthService>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/`, `/health`, `/ready` - public
/// - `/token` - token issuance, guarded by the issuance validator chain
/// - `/metrics` - Prometheus scrape endpoint
/// - `/auth/login`, `/users`, `/users/:id` - require a valid token
/// - the shared middleware stack from [`with_http_layers`]
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let token_state = Arc::new(RequireTokenState::new(state.auth.clone()));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let token_routes = Router::new()
        .route("/token", get(handlers::issue_token))
        .with_state(state.auth.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (valid token required when enforcing)
    let protected_routes = Router::new()
        .route("/auth/login", post(handlers::login))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            token_state,
            require_valid_token,
        ))
        .with_state(state);

    let app = public_routes
        .merge(token_routes)
        .merge(metrics_routes)
        .merge(protected_routes);

    with_http_layers(app)
}

/// Wrap `router` in the middleware stack shared by every route.
///
/// Layer order (outermost first):
/// 1. http_metrics_middleware - records every response, including CORS
///    preflights and timeouts
/// 2. SetRequestIdLayer - assigns `x-request-id` when the client sent none
/// 3. PropagateRequestIdLayer - copies `x-request-id` onto the response
/// 4. CorsLayer - answers preflights for browser clients
/// 5. CompressionLayer - gzip response bodies when accepted
/// 6. TimeoutLayer - 408 after [`REQUEST_TIMEOUT`]
/// 7. TraceLayer - request logging (innermost)
pub fn with_http_layers(router: Router) -> Router {
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors_layer())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Any origin; the `Authorization` header is allowed so browser clients
/// can send bearer tokens.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(CORS_MAX_AGE)
}
