//! Service configuration.
//!
//! Loaded from environment variables with defaults. The database URL, the
//! token store URL and all key material are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default token store URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default issuer written into the `iss` claim.
pub const DEFAULT_AUTH_ISSUER: &str = "user-api";

/// Default private key location when no inline key is configured.
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "auth.pem";

/// Default per-call token store timeout in milliseconds.
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 500;

/// Upper bound for the token store timeout in milliseconds.
pub const MAX_CACHE_TIMEOUT_MS: u64 = 30_000;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Minimum bcrypt cost factor accepted.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum bcrypt cost factor accepted.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default window for retrying the initial database connection.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECONDS: u64 = 160;

/// Default time in-flight requests get to finish after a shutdown signal.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Upper bound for the shutdown drain window.
pub const MAX_DRAIN_SECONDS: u64 = 300;

/// Where the RSA signing key comes from.
#[derive(Clone)]
pub enum PrivateKeySource {
    /// PEM text supplied directly through `AUTH_PRIVATE_KEY`.
    Inline(SecretString),
    /// PEM file on disk.
    Path(PathBuf),
}

impl fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline([REDACTED])"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Token authentication settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Issuer placed in, and required of, every token.
    pub issuer: String,

    /// Enforcing (`true`) or observing (`false`) mode.
    pub enforce: bool,

    /// RSA private key location.
    pub private_key: PrivateKeySource,

    /// Shared key required in `X-Api-Key` for token issuance, if set.
    pub issue_api_key: Option<SecretString>,
}

/// Service configuration.
#[derive(Clone)]
pub struct Config {
    /// Postgres connection URL.
    pub database_url: String,

    /// Redis URL for the token store.
    pub redis_url: String,

    /// HTTP bind address.
    pub bind_address: String,

    /// Human-readable logs instead of JSON.
    pub debug: bool,

    /// Token authentication settings.
    pub auth: AuthSettings,

    /// Per-call timeout for token store operations.
    pub cache_timeout: Duration,

    /// bcrypt cost used when hashing user passwords.
    pub bcrypt_cost: u32,

    /// How long startup keeps retrying the database.
    pub db_connect_timeout: Duration,

    /// How long shutdown waits for in-flight requests.
    pub drain: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("debug", &self.debug)
            .field("auth", &self.auth)
            .field("cache_timeout", &self.cache_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("db_connect_timeout", &self.db_connect_timeout)
            .field("drain", &self.drain)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let redis_url = vars
            .get("REDIS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let debug = parse_bool(vars, "DEBUG", false)?;

        let issuer = vars
            .get("AUTH_ISSUER")
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUTH_ISSUER.to_string());

        let enforce = parse_bool(vars, "AUTH_ENFORCE", true)?;

        let private_key = match vars.get("AUTH_PRIVATE_KEY").filter(|s| !s.is_empty()) {
            Some(pem) => PrivateKeySource::Inline(SecretString::from(pem.clone())),
            None => PrivateKeySource::Path(PathBuf::from(
                vars.get("AUTH_PRIVATE_KEY_PATH")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_PRIVATE_KEY_PATH),
            )),
        };

        let issue_api_key = vars
            .get("AUTH_ISSUE_API_KEY")
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::from(s.clone()));

        let cache_timeout_ms =
            parse_bounded_u64(vars, "CACHE_TIMEOUT_MS", DEFAULT_CACHE_TIMEOUT_MS, 1, MAX_CACHE_TIMEOUT_MS)?;

        let bcrypt_cost = u32::try_from(parse_bounded_u64(
            vars,
            "BCRYPT_COST",
            u64::from(DEFAULT_BCRYPT_COST),
            u64::from(MIN_BCRYPT_COST),
            u64::from(MAX_BCRYPT_COST),
        )?)
        .map_err(|e| ConfigError::InvalidValue {
            name: "BCRYPT_COST".to_string(),
            reason: e.to_string(),
        })?;

        let db_connect_timeout_secs = parse_bounded_u64(
            vars,
            "DB_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_DB_CONNECT_TIMEOUT_SECONDS,
            0,
            3600,
        )?;

        let drain_secs =
            parse_bounded_u64(vars, "API_DRAIN_SECONDS", DEFAULT_DRAIN_SECONDS, 0, MAX_DRAIN_SECONDS)?;

        Ok(Config {
            database_url,
            redis_url,
            bind_address,
            debug,
            auth: AuthSettings {
                issuer,
                enforce,
                private_key,
                issue_api_key,
            },
            cache_timeout: Duration::from_millis(cache_timeout_ms),
            bcrypt_cost,
            db_connect_timeout: Duration::from_secs(db_connect_timeout_secs),
            drain: Duration::from_secs(drain_secs),
        })
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("expected true/false/1/0, got '{value}'"),
            }),
        },
    }
}

fn parse_bounded_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("'{raw}' is not a number: {e}"),
    })?;

    if !(min..=max).contains(&value) {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("{value} is outside {min}..={max}"),
        });
    }

    Ok(value)
}
