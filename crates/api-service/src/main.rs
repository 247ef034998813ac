//! User API
//!
//! REST service for user records. Protected routes require an RSA-signed
//! bearer token issued by `GET /token`.

use api_service::auth::{AuthService, RedisTokenStore, TracingHooks};
use api_service::config::Config;
use api_service::observability::metrics::init_metrics_recorder;
use api_service::routes::{self, AppState};
use api_service::server;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Delay between database connection attempts at startup.
const DB_RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first: DEBUG selects the log format
    let config = Config::from_env()?;

    init_tracing(config.debug);

    info!("Starting User API");
    info!(
        bind_address = %config.bind_address,
        issuer = %config.auth.issuer,
        enforce = config.auth.enforce,
        cache_timeout_ms = u64::try_from(config.cache_timeout.as_millis()).unwrap_or(u64::MAX),
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let db_pool = connect_database(&config.database_url, config.db_connect_timeout).await?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;

    info!("Database ready");

    info!("Connecting to token store...");
    let store = RedisTokenStore::connect(&config.redis_url, config.cache_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to token store: {}", e);
            e
        })?;

    info!("Token store connection established");

    let auth = AuthService::from_settings(&config.auth, Arc::new(store), Arc::new(TracingHooks))
        .map_err(|e| {
            error!("Failed to initialize token signer: {}", e);
            e
        })?;

    info!(
        modulus_bits = auth.signer().modulus_bits(),
        "Token signer initialized"
    );

    // Read what serving needs before moving config
    let drain = config.drain;
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        pool: db_pool,
        config,
        auth: Arc::new(auth),
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("User API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    server::serve(listener, app, shutdown, drain).await?;

    info!("User API shutdown complete");

    Ok(())
}

/// JSON logs by default, human-readable when `debug` is set.
fn init_tracing(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "user_api=debug,api_service=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if debug {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    }
}

/// Connect to Postgres, retrying every 5s until `deadline` has elapsed.
async fn connect_database(url: &str, deadline: Duration) -> Result<PgPool, sqlx::Error> {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        info!(attempt, "Connecting to database...");

        match PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "Database connection established");
                return Ok(pool);
            }
            Err(e) if started.elapsed() + DB_RETRY_INTERVAL < deadline => {
                warn!(
                    attempt,
                    error = %e,
                    retry_in_secs = DB_RETRY_INTERVAL.as_secs(),
                    "Database not reachable, retrying"
                );
                tokio::time::sleep(DB_RETRY_INTERVAL).await;
            }
            Err(e) => {
                error!(attempt, "Failed to connect to database: {}", e);
                return Err(e);
            }
        }
    }
}

/// Cancel `shutdown` once SIGINT or SIGTERM arrives.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let signal_name = wait_for_signal().await;
    info!(signal = signal_name, "Shutdown requested");
    shutdown.cancel();
}

async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                None
            }
        };

        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for SIGINT: {}", e);
                    std::future::pending::<()>().await;
                }
                "SIGINT"
            }
            Some(_) = async {
                match terminate.as_mut() {
                    Some(stream) => stream.recv().await,
                    None => std::future::pending().await,
                }
            } => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}
