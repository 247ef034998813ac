//! Token authentication: signing, the issuance ledger, the validator chain,
//! enforcement policy and the service tying them together.

pub mod claims;
pub mod enforcement;
pub mod error;
pub mod service;
pub mod signer;
pub mod store;
pub mod validators;

pub use claims::{Claims, ClaimsError};
pub use enforcement::{Decision, EnforcementHooks, Enforcer, TracingHooks};
pub use error::AuthError;
pub use service::{AuthConfig, AuthService};
pub use signer::{
    SignedToken, TokenSigner, TokenSigning, SIGNING_ALGORITHM, TOKEN_TTL_SECONDS,
};
pub use store::{RedisTokenStore, StoreError, TokenStore};
pub use validators::{
    ApiKeyValidator, ChainVerdict, RequestValidator, ValidatorChain, ValidatorOutcome,
};
