//! Observability for the user API.
//!
//! All instrumentation uses `#[instrument(skip_all)]` with explicit fields.
//! Tokens, passwords and key material never appear in logs or metric
//! labels; labels are bounded enums and normalized paths.

pub mod metrics;
