//! Signing and verification tests.
//!
//! Covers the issued claim set, the RS* algorithm allow-list, tampering and
//! both private key encodings.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<feature>_<scenario>_<expected_result>`

use api_service::auth::{AuthError, ClaimsError, TOKEN_TTL_SECONDS};
use api_service::config::PrivateKeySource;
use api_service::crypto::{self, CryptoError, RsaSigningKey};
use api_test_utils::*;
use chrono::{Duration, Utc};
use common::secret::SecretString;
use jsonwebtoken::Algorithm;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../api-test-utils/fixtures")
        .join(name)
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn test_sign_then_verify_returns_issued_claims() -> Result<(), anyhow::Error> {
    // Arrange
    let signer = test_signer(1);

    // Act
    let signed = signer.sign(TEST_ISSUER)?;
    let claims = signer.verify(&signed.token)?;

    // Assert
    assert_eq!(claims, signed.claims);
    assert_eq!(claims.iss, TEST_ISSUER);
    assert_eq!(claims.subject, None);
    let iat = claims.iat.ok_or_else(|| anyhow::anyhow!("iat missing"))?;
    assert_eq!(claims.exp - iat, TOKEN_TTL_SECONDS);
    Ok(())
}

#[test]
fn test_sign_uses_rs512_header() -> Result<(), anyhow::Error> {
    let signed = test_signer(1).sign(TEST_ISSUER)?;

    let header = jsonwebtoken::decode_header(&signed.token)?;

    assert_eq!(header.alg, Algorithm::RS512);
    Ok(())
}

#[test]
fn test_verify_accepts_other_rsa_algorithms() -> Result<(), anyhow::Error> {
    let signer = test_signer(1);

    for alg in [Algorithm::RS256, Algorithm::RS384] {
        let token = TestTokenBuilder::new().with_algorithm(alg).sign_with_key(1);
        assert!(signer.verify(&token).is_ok(), "{alg:?} should verify");
    }
    Ok(())
}

#[test]
fn test_pkcs1_key_round_trip() -> Result<(), anyhow::Error> {
    let signer = test_signer(2);

    let signed = signer.sign(TEST_ISSUER)?;

    assert_eq!(signer.verify(&signed.token)?.iss, TEST_ISSUER);
    Ok(())
}

// ============================================================================
// Expiry
// ============================================================================

#[test]
fn test_token_valid_until_exactly_two_hours() -> Result<(), anyhow::Error> {
    let signer = test_signer(1);
    let issued = Utc::now();
    let signed = signer.sign_at(TEST_ISSUER, issued)?;

    let at_expiry = issued + Duration::seconds(TOKEN_TTL_SECONDS);
    let past_expiry = at_expiry + Duration::seconds(1);

    assert!(signer.verify_at(&signed.token, at_expiry, None).is_ok());
    assert!(matches!(
        signer.verify_at(&signed.token, past_expiry, None),
        Err(AuthError::ExpiredOrInvalidClaims(ClaimsError::Expired))
    ));
    Ok(())
}

#[test]
fn test_token_still_valid_one_second_later() -> Result<(), anyhow::Error> {
    let signer = test_signer(1);
    let issued = Utc::now();
    let signed = signer.sign_at("svc", issued)?;

    let claims = signer.verify_at(&signed.token, issued + Duration::seconds(1), Some("svc"))?;

    assert_eq!(claims.iss, "svc");
    Ok(())
}

#[test]
fn test_expired_token_rejected_as_invalid_claims() {
    let signer = test_signer(1);

    let result = signer.verify(&expired_token(60));

    assert!(matches!(
        result,
        Err(AuthError::ExpiredOrInvalidClaims(ClaimsError::Expired))
    ));
}

#[test]
fn test_future_iat_rejected() {
    let signer = test_signer(1);
    let token = TestTokenBuilder::new().issued_in(3600).sign_with_key(1);

    assert!(matches!(
        signer.verify(&token),
        Err(AuthError::ExpiredOrInvalidClaims(ClaimsError::IssuedInFuture))
    ));
}

#[test]
fn test_iat_within_clock_skew_accepted() {
    let signer = test_signer(1);
    let token = TestTokenBuilder::new().issued_in(60).sign_with_key(1);

    assert!(signer.verify(&token).is_ok());
}

#[test]
fn test_wrong_issuer_rejected_when_checked() {
    let signer = test_signer(1);
    let token = TestTokenBuilder::new().with_issuer("someone-else").sign_with_key(1);

    assert!(signer.verify(&token).is_ok());
    assert!(matches!(
        signer.verify_at(&token, Utc::now(), Some(TEST_ISSUER)),
        Err(AuthError::ExpiredOrInvalidClaims(ClaimsError::WrongIssuer))
    ));
}

// ============================================================================
// Hostile Tokens
// ============================================================================

#[test]
fn test_hs256_with_public_key_rejected() {
    let signer = test_signer(1);

    let result = signer.verify(&forged_hs256_token());

    assert!(matches!(result, Err(AuthError::MalformedToken(msg)) if msg.contains("HS256")));
}

#[test]
fn test_alg_none_rejected() {
    let result = test_signer(1).verify(&unsigned_token());

    assert!(matches!(result, Err(AuthError::MalformedToken(_))));
}

#[test]
fn test_tampered_signature_rejected() -> Result<(), anyhow::Error> {
    let signer = test_signer(1);
    let signed = signer.sign(TEST_ISSUER)?;

    let result = signer.verify(&tamper_signature(&signed.token));

    assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    Ok(())
}

#[test]
fn test_tampered_payload_rejected() -> Result<(), anyhow::Error> {
    let signer = test_signer(1);
    let signed = signer.sign(TEST_ISSUER)?;

    let result = signer.verify(&tamper_payload(&signed.token));

    assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    Ok(())
}

#[test]
fn test_token_from_other_key_rejected() -> Result<(), anyhow::Error> {
    let foreign = test_signer(2).sign(TEST_ISSUER)?;

    let result = test_signer(1).verify(&foreign.token);

    assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    Ok(())
}

#[test]
fn test_garbage_rejected() {
    let signer = test_signer(1);

    for token in ["", "not-a-jwt", "a.b.c", "...."] {
        assert!(
            matches!(signer.verify(token), Err(AuthError::MalformedToken(_))),
            "{token:?} should be malformed"
        );
    }
}

// ============================================================================
// Key Loading
// ============================================================================

#[test]
fn test_load_key_from_path() -> Result<(), anyhow::Error> {
    let source = PrivateKeySource::Path(fixture_path("test_rsa_key_2.pem"));

    let pem = crypto::load_private_key_pem(&source)?;
    let key = RsaSigningKey::from_pem(&pem)?;

    assert_eq!(key.modulus_bits(), 2048);
    Ok(())
}

#[test]
fn test_load_key_missing_file_fails() {
    let source = PrivateKeySource::Path(fixture_path("does-not-exist.pem"));

    let result = crypto::load_private_key_pem(&source);

    assert!(matches!(result, Err(CryptoError::KeyLoad { .. })));
}

#[test]
fn test_public_key_is_not_a_signing_key() {
    let result = RsaSigningKey::from_pem(&SecretString::from(test_public_key_pem()));

    assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
}

#[test]
fn test_garbage_key_rejected() {
    let result = RsaSigningKey::from_pem(&SecretString::from("not a key"));

    assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
}
