//! Token store doubles
//!
//! [`MemoryTokenStore`] keeps entries in a map and honors their TTL so tests
//! can inspect what issuance recorded. [`FailingTokenStore`] fails every
//! call, standing in for an unreachable Redis.

use api_service::auth::{StoreError, TokenStore};
use api_service::auth::store::token_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Entry {
    expires_at_unix: i64,
    evict_at: Instant,
}

/// In-memory [`TokenStore`] keyed like the Redis store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored expiry value for `token`, if it is still live.
    pub fn expires_at(&self, token: &str) -> Option<i64> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&token_key(token))
            .filter(|e| e.evict_at > Instant::now())
            .map(|e| e.expires_at_unix)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.expires_at(token).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|e| e.evict_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of live entries, as written to Redis.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .filter(|(_, e)| e.evict_at > now)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, token: &str, expires_at_unix: i64, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            expires_at_unix,
            evict_at: Instant::now() + ttl,
        };
        self.entries.lock().unwrap().insert(token_key(token), entry);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// [`TokenStore`] whose every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTokenStore;

#[async_trait]
impl TokenStore for FailingTokenStore {
    async fn put(&self, _token: &str, _expires_at_unix: i64, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }
}
