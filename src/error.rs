use crate::quote::types::InputError;

/// Errors surfaced by the auth and quote-fetch layers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    #[error("Authentication failed ({failures} consecutive failures): {reason}")]
    AuthFetchFailed { reason: String, failures: u32 },
    #[error("Authentication circuit is open after {failures} consecutive failures")]
    AuthCircuitOpen { failures: u32 },
    #[error("Request to {url} failed after {attempts} attempts: {reason}")]
    RequestFailed {
        url: String,
        attempts: u32,
        reason: String,
    },
    #[error("Unrecognized quote response shape for {product}")]
    NormalizationFailure { product: String },
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QuoteError {
    /// Raised while the auth breaker is open; the orchestrator turns this
    /// into global `auth_broken` state instead of a per-product failure.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, QuoteError::AuthCircuitOpen { .. })
    }
}
