//! Builders for hostile and hand-made test tokens
//!
//! Every builder here produces a token the service must refuse: foreign
//! algorithms, missing signatures, altered bytes or stale claims.

use crate::crypto_fixtures::{test_private_key_pem, test_public_key_pem, TEST_ISSUER};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

/// Builder for test token claims signed with one of the fixture keys.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_issuer("someone-else")
///     .expires_in(60)
///     .sign_with_key(1);
/// ```
pub struct TestTokenBuilder {
    iss: String,
    exp: i64,
    iat: Option<i64>,
    algorithm: Algorithm,
}

impl TestTokenBuilder {
    /// Valid-looking claims from [`TEST_ISSUER`], expiring in an hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: TEST_ISSUER.to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: Some(now.timestamp()),
            algorithm: Algorithm::RS512,
        }
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for the past).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at in seconds from now.
    pub fn issued_in(mut self, seconds: i64) -> Self {
        self.iat = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    pub fn without_iat(mut self) -> Self {
        self.iat = None;
        self
    }

    /// RSA algorithm to sign with (default RS512).
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Claims as JSON.
    pub fn claims(&self) -> Value {
        let mut claims = json!({ "iss": self.iss, "exp": self.exp });
        if let Some(iat) = self.iat {
            claims["iat"] = json!(iat);
        }
        claims
    }

    /// Sign with fixture key `n`.
    pub fn sign_with_key(&self, n: u8) -> String {
        let key = EncodingKey::from_rsa_pem(test_private_key_pem(n).as_bytes())
            .expect("fixture key must parse");
        encode(&Header::new(self.algorithm), &self.claims(), &key).expect("signing must succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HS256 token whose HMAC secret is the service's public key PEM.
///
/// Classic algorithm-confusion forgery; must be refused.
pub fn forged_hs256_token() -> String {
    let claims = TestTokenBuilder::new().claims();
    let key = EncodingKey::from_secret(test_public_key_pem().as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key).expect("HS256 encoding must succeed")
}

/// Unsigned token with `"alg": "none"` and an empty signature segment.
pub fn unsigned_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(TestTokenBuilder::new().claims().to_string());
    format!("{header}.{payload}.")
}

/// Flip one character in the signature segment of `token`.
pub fn tamper_signature(token: &str) -> String {
    let (head, signature) = token.rsplit_once('.').expect("token must have three segments");
    let mut sig: Vec<char> = signature.chars().collect();
    let mid = sig.len() / 2;
    sig[mid] = if sig[mid] == 'A' { 'B' } else { 'A' };
    format!("{head}.{}", sig.into_iter().collect::<String>())
}

/// Replace the payload of `token` with different claims, keeping its signature.
pub fn tamper_payload(token: &str) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token must have three segments");
    let payload = URL_SAFE_NO_PAD.encode(
        TestTokenBuilder::new()
            .with_issuer("attacker")
            .claims()
            .to_string(),
    );
    format!("{}.{payload}.{}", parts[0], parts[2])
}

/// Token from key 1 that expired `seconds_ago` seconds ago.
pub fn expired_token(seconds_ago: i64) -> String {
    TestTokenBuilder::new()
        .issued_in(-seconds_ago - 3600)
        .expires_in(-seconds_ago)
        .sign_with_key(1)
}
