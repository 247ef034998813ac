//! Signer doubles
//!
//! [`FailingSigner`] refuses to sign, so issuance tests can reach the
//! signing-failure path without a broken key.

use api_service::auth::{AuthError, SignedToken, TokenSigning};

/// [`TokenSigning`] whose every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSigner;

impl TokenSigning for FailingSigner {
    fn sign(&self, _issuer: &str) -> Result<SignedToken, AuthError> {
        Err(AuthError::SigningFailed("signing key unavailable".to_string()))
    }
}
