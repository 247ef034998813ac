//! Test server harness for E2E testing
//!
//! Provides TestApiServer for spawning real user API instances in tests.
//! Each server signs with fixture key 1, records tokens in a
//! [`MemoryTokenStore`] and reports auth failures to [`RecordingHooks`].

use crate::crypto_fixtures::{test_private_key_pem, TEST_ISSUER};
use crate::hooks::RecordingHooks;
use crate::mock_store::{FailingTokenStore, MemoryTokenStore};
use api_service::auth::{AuthConfig, AuthService, RequestValidator, TokenStore};
use api_service::config::{
    AuthSettings, Config, PrivateKeySource, DEFAULT_CACHE_TIMEOUT_MS,
    DEFAULT_DB_CONNECT_TIMEOUT_SECONDS, MIN_BCRYPT_COST,
};
use api_service::models::TokenResponse;
use api_service::observability::metrics::init_metrics_recorder;
use api_service::routes::{self, AppState};
use common::secret::SecretString;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Knobs for [`TestApiServer::spawn_with`].
pub struct TestServerOptions {
    /// Enforcing (`true`, default) or observing.
    pub enforce: bool,
    /// Issuance validators; empty by default so any caller gets a token.
    pub validators: Vec<Arc<dyn RequestValidator>>,
    /// Use a store that fails every call.
    pub failing_store: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            enforce: true,
            validators: Vec::new(),
            failing_store: false,
        }
    }
}

impl TestServerOptions {
    pub fn observe(mut self) -> Self {
        self.enforce = false;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn RequestValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_failing_store(mut self) -> Self {
        self.failing_store = true;
        self
    }
}

/// Test harness for spawning the user API in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_users_e2e(pool: PgPool) -> Result<(), anyhow::Error> {
///     let server = TestApiServer::spawn(pool).await?;
///     let token = server.issue_token().await?;
///
///     let response = server
///         .client()
///         .get(format!("{}/users", server.url()))
///         .bearer_auth(&token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestApiServer {
    addr: SocketAddr,
    pool: PgPool,
    auth: Arc<AuthService>,
    store: Arc<MemoryTokenStore>,
    hooks: Arc<RecordingHooks>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestApiServer {
    /// Spawn an enforcing server with an empty validator chain.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with(pool, TestServerOptions::default()).await
    }

    /// Spawn a server with custom auth options
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Sign tokens with fixture key 1 for [`TEST_ISSUER`]
    /// - Start the HTTP server in the background
    pub async fn spawn_with(pool: PgPool, options: TestServerOptions) -> Result<Self, anyhow::Error> {
        let private_key = SecretString::from(test_private_key_pem(1));

        let config = Config {
            database_url: String::new(), // Not used after connection established
            redis_url: String::new(),
            bind_address: "127.0.0.1:0".to_string(),
            debug: true,
            auth: AuthSettings {
                issuer: TEST_ISSUER.to_string(),
                enforce: options.enforce,
                private_key: PrivateKeySource::Inline(private_key.clone()),
                issue_api_key: None,
            },
            cache_timeout: Duration::from_millis(DEFAULT_CACHE_TIMEOUT_MS),
            bcrypt_cost: MIN_BCRYPT_COST,
            db_connect_timeout: Duration::from_secs(DEFAULT_DB_CONNECT_TIMEOUT_SECONDS),
            drain: Duration::ZERO,
        };

        let store = Arc::new(MemoryTokenStore::new());
        let hooks = Arc::new(RecordingHooks::new());
        let active_store: Arc<dyn TokenStore> = if options.failing_store {
            Arc::new(FailingTokenStore)
        } else {
            store.clone()
        };

        let key = api_service::crypto::RsaSigningKey::from_pem(&private_key)
            .map_err(|e| anyhow::anyhow!("Failed to parse test signing key: {}", e))?;
        let auth = Arc::new(AuthService::new(
            key,
            AuthConfig {
                issuer: TEST_ISSUER.to_string(),
                enforce: options.enforce,
                validators: options.validators,
                hooks: hooks.clone(),
                store: active_store,
            },
        ));

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config,
            auth: auth.clone(),
        });

        // The global recorder can only be installed once per test process;
        // later servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            auth,
            store,
            hooks,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    /// Tokens recorded by issuance (unused when spawned with a failing store).
    pub fn store(&self) -> &MemoryTokenStore {
        &self.store
    }

    pub fn hooks(&self) -> &RecordingHooks {
        &self.hooks
    }

    /// Obtain a token through `GET /token`.
    pub async fn issue_token(&self) -> Result<String, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}/token", self.url()))
            .send()
            .await?
            .error_for_status()?;

        let body: TokenResponse = response.json().await?;
        anyhow::ensure!(body.success, "token issuance reported failure");
        Ok(body.token)
    }
}

impl Drop for TestApiServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
