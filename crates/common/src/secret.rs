//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used across the user API. Wrap
//! passwords, private key material and issuance API keys in these types.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` and holds one stays safe to log with `{:?}` or through
//! `tracing` fields. Secrets are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     email: "alice@example.com".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! let rendered = format!("{form:?}");
//! assert!(!rendered.contains("hunter2"));
//!
//! // Reading the value requires an explicit call
//! let password: &str = form.password.expose_secret();
//! assert_eq!(password, "hunter2");
//! ```
//!
//! # Serde Integration
//!
//! With the `serde` feature enabled, secrets deserialize from form or JSON
//! bodies directly:
//!
//! ```rust
//! use serde::Deserialize;
//! use common::secret::SecretString;
//!
//! #[derive(Debug, Deserialize)]
//! struct NewUser {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let json = r#"{"email": "bob@example.com", "password": "pa55word"}"#;
//! let user: NewUser = serde_json::from_str(json).unwrap();
//! assert!(!format!("{user:?}").contains("pa55word"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
