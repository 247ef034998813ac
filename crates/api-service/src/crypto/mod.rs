//! Key material and password hashing.
//!
//! - RSA private key loading (inline PEM or file), PKCS#1 and PKCS#8
//! - Public key derivation for verification
//! - bcrypt password hashing with a bounded cost factor

use crate::config::{PrivateKeySource, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{DecodingKey, EncodingKey};
use ring::signature::{KeyPair, RsaKeyPair};
use thiserror::Error;
use tracing::instrument;

const PKCS8_LABEL: &str = "PRIVATE KEY";
const PKCS1_LABEL: &str = "RSA PRIVATE KEY";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to read private key from {path}: {reason}")]
    KeyLoad { path: String, reason: String },

    #[error("invalid RSA private key: {0}")]
    InvalidKey(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// An RSA keypair ready for JWT signing and verification.
///
/// Built once at startup; both halves are read-only afterwards.
pub struct RsaSigningKey {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    modulus_bits: usize,
}

impl std::fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("modulus_bits", &self.modulus_bits)
            .finish_non_exhaustive()
    }
}

impl RsaSigningKey {
    /// Parse a PEM-encoded RSA private key and derive its public half.
    #[instrument(skip_all, name = "api.crypto.parse_key")]
    pub fn from_pem(pem: &SecretString) -> Result<Self, CryptoError> {
        let pem_text = pem.expose_secret();

        let block = pem::parse(pem_text)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid PEM: {e}")))?;

        let key_pair = match block.tag() {
            PKCS8_LABEL => RsaKeyPair::from_pkcs8(block.contents()),
            PKCS1_LABEL => RsaKeyPair::from_der(block.contents()),
            other => {
                return Err(CryptoError::InvalidKey(format!(
                    "unsupported PEM label '{other}'"
                )))
            }
        }
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(pem_text.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_der(key_pair.public_key().as_ref());

        Ok(Self {
            encoding_key,
            decoding_key,
            modulus_bits: key_pair.public().modulus_len() * 8,
        })
    }

    /// Private half, used to sign.
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Public half, used to verify.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }
}

/// Read the PEM text for the configured key source.
#[instrument(skip_all, name = "api.crypto.load_key")]
pub fn load_private_key_pem(source: &PrivateKeySource) -> Result<SecretString, CryptoError> {
    match source {
        PrivateKeySource::Inline(pem) => Ok(pem.clone()),
        PrivateKeySource::Path(path) => std::fs::read_to_string(path)
            .map(SecretString::from)
            .map_err(|e| CryptoError::KeyLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Hash a password with bcrypt.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, CryptoError> {
    // Config already bounds the cost; callers may pass one directly.
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(CryptoError::PasswordHash(format!(
            "invalid bcrypt cost: {cost} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})"
        )));
    }

    bcrypt::hash(password, cost).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    bcrypt::verify(password, hash).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}
