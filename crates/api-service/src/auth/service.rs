//! Token authentication service.
//!
//! Owns the signing key, the validator chain, the token store handle and
//! the enforcement hooks. Holds no per-request state; share it behind an
//! `Arc` and call it concurrently.

use crate::auth::claims::Claims;
use crate::auth::enforcement::{EnforcementHooks, Enforcer};
use crate::auth::error::AuthError;
use crate::auth::signer::{SignedToken, TokenSigner, TokenSigning};
use crate::auth::store::TokenStore;
use crate::auth::validators::{
    ApiKeyValidator, ChainVerdict, RequestValidator, ValidatorChain,
};
use crate::config::AuthSettings;
use crate::crypto::{self, CryptoError, RsaSigningKey};
use crate::errors::ApiError;
use crate::models::TokenResponse;
use crate::observability::metrics;
use axum::http::{request::Parts, StatusCode};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Construction parameters for [`AuthService`].
pub struct AuthConfig {
    /// Issuer written into, and required of, every token.
    pub issuer: String,
    /// Enforcing (`true`) or observing (`false`).
    pub enforce: bool,
    /// Issuance guards, in evaluation order.
    pub validators: Vec<Arc<dyn RequestValidator>>,
    /// Failure callbacks.
    pub hooks: Arc<dyn EnforcementHooks>,
    /// Issuance ledger.
    pub store: Arc<dyn TokenStore>,
}

pub struct AuthService {
    signer: Arc<TokenSigner>,
    signing: Arc<dyn TokenSigning>,
    issuer: String,
    enforce: bool,
    validators: ValidatorChain,
    hooks: Arc<dyn EnforcementHooks>,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.issuer)
            .field("enforce", &self.enforce)
            .field("validators", &self.validators)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(key: RsaSigningKey, config: AuthConfig) -> Self {
        let signer = Arc::new(TokenSigner::new(key));
        Self {
            signing: signer.clone(),
            signer,
            issuer: config.issuer,
            enforce: config.enforce,
            validators: ValidatorChain::new(config.validators),
            hooks: config.hooks,
            store: config.store,
        }
    }

    /// Build the service from configuration, loading the signing key.
    ///
    /// When an issuance API key is configured the chain holds an
    /// [`ApiKeyValidator`]; otherwise it is empty and every request may
    /// receive a token.
    pub fn from_settings(
        settings: &AuthSettings,
        store: Arc<dyn TokenStore>,
        hooks: Arc<dyn EnforcementHooks>,
    ) -> Result<Self, CryptoError> {
        let pem = crypto::load_private_key_pem(&settings.private_key)?;
        let key = RsaSigningKey::from_pem(&pem)?;

        let mut validators: Vec<Arc<dyn RequestValidator>> = Vec::new();
        if let Some(api_key) = &settings.issue_api_key {
            validators.push(Arc::new(ApiKeyValidator::new(api_key.clone())));
        }

        Ok(Self::new(
            key,
            AuthConfig {
                issuer: settings.issuer.clone(),
                enforce: settings.enforce,
                validators,
                hooks,
                store,
            },
        ))
    }

    /// Replace the issuance signer. Verification keeps using the RSA key.
    #[must_use]
    pub fn with_signing(mut self, signing: Arc<dyn TokenSigning>) -> Self {
        self.signing = signing;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforce
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Verification failure policy for a middleware being built.
    pub fn enforcer(&self) -> Enforcer {
        Enforcer::from_flag(self.enforce, self.hooks.clone())
    }

    /// Run the validator chain against a request.
    pub fn valid_request(&self, request: &Parts) -> ChainVerdict {
        self.validators.evaluate(request)
    }

    /// Sign a token and record it in the store.
    pub async fn new_signed_token(&self) -> Result<SignedToken, AuthError> {
        let signed = self.signing.sign(&self.issuer)?;
        self.persist(&signed).await?;
        Ok(signed)
    }

    /// Issue a token for `request`.
    ///
    /// Validator and signing failures go to the token-blocked hook; they
    /// only stop issuance when enforcing. An observed signing failure
    /// answers `success: true` with an empty token and records nothing.
    /// A store failure always fails the call.
    #[instrument(skip_all, name = "api.auth.issue_token")]
    pub async fn issue_token(&self, request: &Parts) -> Result<TokenResponse, ApiError> {
        match self.valid_request(request) {
            ChainVerdict::Valid => {}
            ChainVerdict::Rejected(reason) => {
                self.block(request, AuthError::ValidationRejected(reason), StatusCode::UNAUTHORIZED)?;
            }
            ChainVerdict::NoValidatorPassed => {
                self.block(
                    request,
                    AuthError::ValidationRejected("no validator passed".to_string()),
                    StatusCode::UNAUTHORIZED,
                )?;
            }
        }

        let signed = match self.signing.sign(&self.issuer) {
            Ok(signed) => signed,
            Err(err) => {
                self.block(request, err, StatusCode::INTERNAL_SERVER_ERROR)?;
                return Ok(TokenResponse::empty());
            }
        };

        self.persist(&signed).await?;

        metrics::record_token_issuance("success", None);
        debug!(target: "api.auth.service", exp = signed.claims.exp, "Token issued");

        Ok(TokenResponse::issued(signed.token))
    }

    /// Verify a token's signature and claims, including the issuer.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_token_at(token, Utc::now())
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        self.signer.verify_at(token, now, Some(&self.issuer))
    }

    fn block(&self, request: &Parts, err: AuthError, status: StatusCode) -> Result<(), ApiError> {
        self.hooks.token_blocked(request, &err, status);
        if self.enforce {
            Err(ApiError::from(err))
        } else {
            Ok(())
        }
    }

    async fn persist(&self, signed: &SignedToken) -> Result<(), AuthError> {
        let remaining = signed.claims.exp - Utc::now().timestamp();
        let ttl = Duration::from_secs(u64::try_from(remaining).unwrap_or(0));

        match self.store.put(&signed.token, signed.claims.exp, ttl).await {
            Ok(()) => {
                metrics::record_token_store_write("success");
                Ok(())
            }
            Err(e) => {
                metrics::record_token_store_write("error");
                Err(AuthError::CacheWriteFailed(e))
            }
        }
    }
}
