//! User API Service Library
//!
//! A small REST service for user records whose protected routes sit behind
//! RSA-signed bearer tokens.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> repositories/*.rs
//!                                      \-> auth::AuthService (sign, store, verify)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token signing, verification, validator chain, store and enforcement
//! - `config` - Service configuration from environment
//! - `crypto` - Key loading and password hashing
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Token middleware and HTTP metrics
//! - `models` - Request, response and database models
//! - `observability` - Prometheus metrics
//! - `repositories` - Database access
//! - `routes` - Axum router setup
//! - `server` - Serving with a bounded shutdown drain

pub mod auth;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod server;
