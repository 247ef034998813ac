//! Token store: an issuance ledger backed by Redis.
//!
//! Every issued token is written as `token:<token>` with the expiry Unix
//! timestamp as its value and a TTL matching the token's remaining
//! lifetime. Expired entries disappear through Redis TTL enforcement.
//!
//! The store is write-only from the service's point of view. Verification
//! never consults it.
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so each call clones it. Every call is wrapped in a timeout
//! so an unavailable Redis fails the request fast instead of hanging it.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, instrument, warn};

/// Key prefix for issued tokens.
pub const TOKEN_KEY_PREFIX: &str = "token:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store connection failed: {0}")]
    Connection(String),

    #[error("token store command failed: {0}")]
    Command(String),

    #[error("token store call timed out")]
    Timeout,
}

/// Records issued tokens for the length of their validity window.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Record `token` with its expiry timestamp, expiring after `ttl`.
    async fn put(&self, token: &str, expires_at_unix: i64, ttl: Duration) -> Result<(), StoreError>;

    /// Connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Build the cache key for a token.
pub fn token_key(token: &str) -> String {
    format!("{TOKEN_KEY_PREFIX}{token}")
}

/// Redis-backed [`TokenStore`].
#[derive(Clone)]
pub struct RedisTokenStore {
    connection: MultiplexedConnection,
    timeout: Duration,
}

impl RedisTokenStore {
    /// Connect to Redis and confirm it answers `PING`.
    ///
    /// The URL is never logged; it may carry credentials.
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "api.store.redis", error = %e, "Failed to open Redis client");
            StoreError::Connection(e.to_string())
        })?;

        let connection = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                error!(target: "api.store.redis", "Timed out connecting to Redis");
                StoreError::Timeout
            })?
            .map_err(|e| {
                error!(target: "api.store.redis", error = %e, "Failed to connect to Redis");
                StoreError::Connection(e.to_string())
            })?;

        let store = Self {
            connection,
            timeout,
        };
        store.ping().await?;

        Ok(store)
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    #[instrument(skip_all, name = "api.store.put", fields(ttl_secs = ttl.as_secs()))]
    async fn put(&self, token: &str, expires_at_unix: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let key = token_key(token);
        // SET EX rejects a zero TTL.
        let seconds = ttl.as_secs().max(1);

        tokio::time::timeout(self.timeout, conn.set_ex::<_, _, ()>(&key, expires_at_unix, seconds))
            .await
            .map_err(|_| {
                warn!(target: "api.store.redis", "Token write timed out");
                StoreError::Timeout
            })?
            .map_err(|e| {
                warn!(target: "api.store.redis", error = %e, "Token write failed");
                StoreError::Command(e.to_string())
            })
    }

    #[instrument(skip_all, name = "api.store.ping")]
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();

        let reply = tokio::time::timeout(self.timeout, async {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(pong)
        })
        .await
        .map_err(|_| StoreError::Timeout)?;

        let pong = reply.map_err(|e| {
            warn!(target: "api.store.redis", error = %e, "Redis PING failed");
            StoreError::Command(e.to_string())
        })?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Command(format!("unexpected PING reply: {pong}")))
        }
    }
}
