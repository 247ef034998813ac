//! RSA token signing and verification.
//!
//! Tokens are signed with RS512. Verification accepts the RSA PKCS#1 family
//! only (RS256, RS384, RS512); the header algorithm is checked before the
//! signature so `HS256`, `none` and friends are refused outright.
//!
//! Signature verification and claim validation are separate steps:
//! [`TokenSigner::decode`] fails with `MalformedToken`, and
//! [`Claims::validate`] failures surface as `ExpiredOrInvalidClaims`.

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::crypto::RsaSigningKey;
use chrono::{DateTime, Utc};
use common::jwt::{extract_algorithm, is_rsa_algorithm};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use std::collections::HashSet;
use tracing::instrument;

/// Lifetime of every issued token in seconds (2 hours). Not caller-adjustable.
pub const TOKEN_TTL_SECONDS: i64 = 2 * 60 * 60;

/// Algorithm used for newly issued tokens.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS512;

/// A freshly signed token and the claims it encodes.
#[derive(Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

impl std::fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedToken")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Produces the signed tokens handed out by issuance.
pub trait TokenSigning: Send + Sync {
    fn sign(&self, issuer: &str) -> Result<SignedToken, AuthError>;
}

/// Signs and verifies tokens with one RSA keypair.
#[derive(Debug)]
pub struct TokenSigner {
    key: RsaSigningKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(key: RsaSigningKey) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
        // Claims are validated separately so expiry and signature failures stay distinct.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self { key, validation }
    }

    /// Size of the signing key's RSA modulus.
    pub fn modulus_bits(&self) -> usize {
        self.key.modulus_bits()
    }

    /// Sign a token for `issuer`, expiring [`TOKEN_TTL_SECONDS`] from now.
    pub fn sign(&self, issuer: &str) -> Result<SignedToken, AuthError> {
        self.sign_at(issuer, Utc::now())
    }

    /// Sign a token for `issuer` as if issued at `now`.
    #[instrument(skip_all, name = "api.auth.sign")]
    pub fn sign_at(&self, issuer: &str, now: DateTime<Utc>) -> Result<SignedToken, AuthError> {
        let claims = Claims::issued_at(issuer, now, TOKEN_TTL_SECONDS);
        let header = Header::new(SIGNING_ALGORITHM);

        let token = encode(&header, &claims, self.key.encoding_key()).map_err(|e| {
            tracing::error!(target: "api.auth.signer", error = %e, "Token signing failed");
            AuthError::SigningFailed(e.to_string())
        })?;

        Ok(SignedToken { token, claims })
    }

    /// Check the algorithm family and signature, returning the claims unvalidated.
    #[instrument(skip_all, name = "api.auth.decode")]
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let alg = extract_algorithm(token).map_err(|e| {
            tracing::debug!(target: "api.auth.signer", error = ?e, "Token header rejected");
            AuthError::MalformedToken(e.to_string())
        })?;

        if !is_rsa_algorithm(&alg) {
            tracing::debug!(target: "api.auth.signer", alg = %alg, "Unexpected signing method");
            return Err(AuthError::MalformedToken(format!(
                "unexpected signing method: {alg}"
            )));
        }

        let data = decode::<Claims>(token, self.key.decoding_key(), &self.validation).map_err(|e| {
            tracing::debug!(target: "api.auth.signer", error = %e, "Token signature verification failed");
            AuthError::MalformedToken(e.to_string())
        })?;

        Ok(data.claims)
    }

    /// Verify signature and time-based claims at the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now(), None)
    }

    /// Verify signature, then validate claims at `now` (and the issuer, if given).
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expected_issuer: Option<&str>,
    ) -> Result<Claims, AuthError> {
        let claims = self.decode(token)?;
        claims.validate(now, expected_issuer)?;
        Ok(claims)
    }
}

impl TokenSigning for TokenSigner {
    fn sign(&self, issuer: &str) -> Result<SignedToken, AuthError> {
        self.sign_at(issuer, Utc::now())
    }
}
