//! Request validator chain gating token issuance.
//!
//! Each validator inspects the request head and answers [`ValidatorOutcome`].
//! The chain is built once and never changes afterwards.
//!
//! Aggregate rule:
//! - empty chain: valid
//! - any `Reject`: invalid, evaluation stops there
//! - otherwise valid iff at least one validator returned `Pass`
//!
//! A chain where every validator skips is therefore invalid.

use axum::http::request::Parts;
use common::secret::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// Header carrying the issuance API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Answer of a single validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorOutcome {
    /// The request is entitled to a token.
    Pass,
    /// This validator has no opinion on the request.
    Skip,
    /// The request must not receive a token.
    Reject(String),
}

/// Aggregate answer of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    Valid,
    /// A validator rejected the request.
    Rejected(String),
    /// Validators exist but none passed.
    NoValidatorPassed,
}

impl ChainVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainVerdict::Valid)
    }
}

/// A pluggable predicate over an incoming request.
pub trait RequestValidator: Send + Sync {
    fn validate(&self, request: &Parts) -> ValidatorOutcome;
}

impl<F> RequestValidator for F
where
    F: Fn(&Parts) -> ValidatorOutcome + Send + Sync,
{
    fn validate(&self, request: &Parts) -> ValidatorOutcome {
        self(request)
    }
}

/// Immutable, ordered set of validators.
#[derive(Clone, Default)]
pub struct ValidatorChain {
    validators: Arc<[Arc<dyn RequestValidator>]>,
}

impl fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorChain")
            .field("len", &self.validators.len())
            .finish()
    }
}

impl ValidatorChain {
    pub fn new(validators: Vec<Arc<dyn RequestValidator>>) -> Self {
        Self {
            validators: validators.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every validator in order and combine their answers.
    pub fn evaluate(&self, request: &Parts) -> ChainVerdict {
        let mut passed = self.validators.is_empty();

        for validator in self.validators.iter() {
            match validator.validate(request) {
                ValidatorOutcome::Pass => passed = true,
                ValidatorOutcome::Skip => {}
                ValidatorOutcome::Reject(reason) => return ChainVerdict::Rejected(reason),
            }
        }

        if passed {
            ChainVerdict::Valid
        } else {
            ChainVerdict::NoValidatorPassed
        }
    }
}

/// Passes requests presenting the configured key in `X-Api-Key`.
///
/// Skips when the header is absent; rejects a wrong key.
pub struct ApiKeyValidator {
    key: SecretString,
}

impl ApiKeyValidator {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }
}

impl RequestValidator for ApiKeyValidator {
    fn validate(&self, request: &Parts) -> ValidatorOutcome {
        let Some(presented) = request.headers.get(API_KEY_HEADER) else {
            return ValidatorOutcome::Skip;
        };

        let expected = self.key.expose_secret().as_bytes();
        #[allow(deprecated)]
        let matches =
            ring::constant_time::verify_slices_are_equal(presented.as_bytes(), expected).is_ok();

        if matches {
            ValidatorOutcome::Pass
        } else {
            ValidatorOutcome::Reject("api key mismatch".to_string())
        }
    }
}
