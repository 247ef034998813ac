//! Fixed RSA key fixtures for testing
//!
//! Keys are checked in under `fixtures/` so signatures are reproducible and
//! tests never pay for RSA key generation.
//!
//! - key 1: 2048-bit, PKCS#8 (`BEGIN PRIVATE KEY`)
//! - key 2: 2048-bit, PKCS#1 (`BEGIN RSA PRIVATE KEY`), unrelated to key 1

use api_service::auth::TokenSigner;
use api_service::crypto::RsaSigningKey;
use common::secret::SecretString;

const TEST_RSA_KEY_1: &str = include_str!("../fixtures/test_rsa_key_1.pem");
const TEST_RSA_KEY_1_PUBLIC: &str = include_str!("../fixtures/test_rsa_key_1.pub.pem");
const TEST_RSA_KEY_2: &str = include_str!("../fixtures/test_rsa_key_2.pem");

/// Issuer used by every test server and signer.
pub const TEST_ISSUER: &str = "user-api-test";

/// PEM text of test private key `n` (1 or 2).
///
/// # Panics
/// On any other key number.
pub fn test_private_key_pem(n: u8) -> &'static str {
    match n {
        1 => TEST_RSA_KEY_1,
        2 => TEST_RSA_KEY_2,
        other => panic!("no test RSA key {other}; fixtures provide keys 1 and 2"),
    }
}

/// Public half of key 1, in SubjectPublicKeyInfo PEM form.
pub fn test_public_key_pem() -> &'static str {
    TEST_RSA_KEY_1_PUBLIC
}

/// Parsed signing key `n`.
pub fn test_signing_key(n: u8) -> RsaSigningKey {
    RsaSigningKey::from_pem(&SecretString::from(test_private_key_pem(n)))
        .expect("fixture key must parse")
}

/// Signer over key `n`.
pub fn test_signer(n: u8) -> TokenSigner {
    TokenSigner::new(test_signing_key(n))
}
