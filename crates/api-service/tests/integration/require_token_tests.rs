//! Tests for the `require_valid_token` middleware.
//!
//! A counting handler sits behind the middleware so tests can tell whether
//! the request reached it and whether an identity was attached.

use api_service::auth::{AuthConfig, AuthService};
use api_service::middleware::{require_valid_token, RequireTokenState, TokenExt};
use api_test_utils::*;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::{middleware, Router};
use http_body_util::BodyExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct Fixture {
    app: Router,
    auth: Arc<AuthService>,
    hooks: Arc<RecordingHooks>,
    handler_calls: Arc<AtomicUsize>,
}

fn fixture(enforce: bool) -> Fixture {
    let hooks = Arc::new(RecordingHooks::new());
    let auth = Arc::new(AuthService::new(
        test_signing_key(1),
        AuthConfig {
            issuer: TEST_ISSUER.to_string(),
            enforce,
            validators: Vec::new(),
            hooks: hooks.clone(),
            store: Arc::new(MemoryTokenStore::new()),
        },
    ));

    let handler_calls = Arc::new(AtomicUsize::new(0));
    let counter = handler_calls.clone();
    let handler = move |request: Request| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            match request.authenticated_token() {
                Some(_) => "authenticated",
                None => "anonymous",
            }
        }
    };

    let app = Router::new()
        .route("/users", get(handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::new(RequireTokenState::new(auth.clone())),
            require_valid_token,
        ));

    Fixture {
        app,
        auth,
        hooks,
        handler_calls,
    }
}

async fn send(app: Router, uri: &str, authorization: Option<&str>) -> (StatusCode, String, bool) {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();

    let status = response.status();
    let has_challenge = response.headers().contains_key(header::WWW_AUTHENTICATE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap(), has_challenge)
}

fn error_code(body: &str) -> String {
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    json["error_code"].as_str().unwrap_or_default().to_string()
}

// ============================================================================
// Enforcing
// ============================================================================

#[tokio::test]
async fn test_missing_token_aborts_with_401() {
    // Arrange
    let fx = fixture(true);

    // Act
    let (status, body, has_challenge) = send(fx.app, "/users", None).await;

    // Assert
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(has_challenge);
    assert_eq!(error_code(&body), "MISSING_TOKEN");
    assert_eq!(fx.handler_calls.load(Ordering::SeqCst), 0);

    let aborts = fx.hooks.calls_of(HookKind::Abort);
    assert_eq!(aborts.len(), 1);
    assert_eq!(aborts[0].path, "/users");
    assert_eq!(aborts[0].status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_token_aborts_with_401() {
    let fx = fixture(true);
    let bearer = format!("Bearer {}", forged_hs256_token());

    let (status, body, _) = send(fx.app, "/users", Some(&bearer)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
    assert_eq!(fx.handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_aborts_with_401() {
    let fx = fixture(true);
    let bearer = format!("Bearer {}", expired_token(1));

    let (status, body, _) = send(fx.app, "/users", Some(&bearer)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_CLAIMS");
}

#[tokio::test]
async fn test_foreign_issuer_aborts_with_401() {
    let fx = fixture(true);
    let token = TestTokenBuilder::new().with_issuer("other-service").sign_with_key(1);

    let (status, body, _) = send(fx.app, &format!("/users?token={token}"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_CLAIMS");
}

#[tokio::test]
async fn test_token_from_other_key_aborts_with_401() {
    let fx = fixture(true);
    let token = TestTokenBuilder::new().sign_with_key(2);

    let (status, _, _) = send(fx.app, "/users", Some(&format!("Bearer {token}"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Valid Tokens
// ============================================================================

#[tokio::test]
async fn test_valid_bearer_token_attaches_identity() -> Result<(), anyhow::Error> {
    let fx = fixture(true);
    let signed = fx.auth.new_signed_token().await?;

    let (status, body, _) = send(fx.app, "/users", Some(&format!("Bearer {}", signed.token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "authenticated");
    assert!(fx.hooks.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_valid_query_token_attaches_identity() -> Result<(), anyhow::Error> {
    let fx = fixture(true);
    let signed = fx.auth.new_signed_token().await?;

    let (status, body, _) = send(fx.app, &format!("/users?token={}", signed.token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "authenticated");
    Ok(())
}

#[tokio::test]
async fn test_repeated_query_token_checks_first_value() -> Result<(), anyhow::Error> {
    let fx = fixture(true);
    let signed = fx.auth.new_signed_token().await?;
    let uri = format!("/users?token={}&token=not-a-jwt", signed.token);

    let (status, body, _) = send(fx.app, &uri, Some("Bearer not-a-jwt")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "authenticated");
    Ok(())
}

#[tokio::test]
async fn test_multi_credential_header_uses_bearer_entry() -> Result<(), anyhow::Error> {
    let fx = fixture(true);
    let signed = fx.auth.new_signed_token().await?;
    let header_value = format!("Basic dXNlcjpwYXNz, Bearer {}", signed.token);

    let (status, body, _) = send(fx.app, "/users", Some(&header_value)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "authenticated");
    Ok(())
}

#[tokio::test]
async fn test_valid_token_without_store_entry_is_accepted() {
    // The store is an audit log only; verification never consults it.
    let fx = fixture(true);
    let token = TestTokenBuilder::new().sign_with_key(1);

    let (status, body, _) = send(fx.app, "/users", Some(&format!("Bearer {token}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "authenticated");
}

// ============================================================================
// Observing
// ============================================================================

#[tokio::test]
async fn test_observe_missing_token_continues_anonymously() {
    // Arrange
    let fx = fixture(false);

    // Act
    let (status, body, has_challenge) = send(fx.app, "/users", None).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "anonymous");
    assert!(!has_challenge);
    assert_eq!(fx.handler_calls.load(Ordering::SeqCst), 1);

    let continued = fx.hooks.calls_of(HookKind::Continue);
    assert_eq!(continued.len(), 1);
    assert_eq!(continued[0].code, "MISSING_TOKEN");
    assert!(fx.hooks.calls_of(HookKind::Abort).is_empty());
}

#[tokio::test]
async fn test_observe_invalid_token_continues_anonymously() {
    let fx = fixture(false);
    let bearer = format!("Bearer {}", unsigned_token());

    let (status, body, _) = send(fx.app, "/users", Some(&bearer)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "anonymous");
    assert_eq!(fx.hooks.calls_of(HookKind::Continue)[0].code, "INVALID_TOKEN");
}

#[tokio::test]
async fn test_observe_valid_token_attaches_identity() -> Result<(), anyhow::Error> {
    let fx = fixture(false);
    let signed = fx.auth.new_signed_token().await?;

    let (status, body, _) = send(fx.app, "/users", Some(&format!("Bearer {}", signed.token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "authenticated");
    assert!(fx.hooks.calls().is_empty());
    Ok(())
}
