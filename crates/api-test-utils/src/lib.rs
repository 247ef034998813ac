//! # User API Test Utilities
//!
//! Shared test utilities for the user API service.
//!
//! This crate provides:
//! - Fixed RSA keys (PKCS#8 and PKCS#1) for reproducible signing tests
//! - Hostile token builders (forged, unsigned, tampered, expired)
//! - In-memory and failing token stores
//! - A signer that always fails
//! - Enforcement hooks that record every call
//! - Server test harness (TestApiServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use api_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<(), anyhow::Error> {
//!     let server = TestApiServer::spawn(pool).await?;
//!     let token = server.issue_token().await?;
//!
//!     let response = server
//!         .client()
//!         .get(format!("{}/users", server.url()))
//!         .bearer_auth(&token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod hooks;
pub mod mock_signer;
pub mod mock_store;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use hooks::*;
pub use mock_signer::*;
pub use mock_store::*;
pub use server_harness::*;
pub use token_builders::*;
