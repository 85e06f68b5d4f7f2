use crate::auth::circuit_breaker::{CircuitBreaker, CircuitBreakerState};
use crate::auth::token_store::TokenStore;
use crate::auth::types::{AuthConfig, Token};
use crate::error::QuoteError;
use crate::http::{HttpRequest, HttpTransport};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Obtains bearer tokens from the auth endpoint.
///
/// Refreshes are serialized through `refresh_lock`: callers that queued
/// behind a refresh which already produced a usable token reuse it instead of
/// hitting the endpoint again.
pub struct AuthGateway {
    config: AuthConfig,
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn HttpTransport>,
    circuit_breaker: CircuitBreaker,
    refresh_lock: Mutex<()>,
}

impl AuthGateway {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let circuit_breaker = CircuitBreaker::new(config.max_failures, Arc::clone(&store));
        Self {
            config,
            store,
            transport,
            circuit_breaker,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Return the stored token if still valid, otherwise fetch a new one
    pub async fn ensure_valid_token(&self) -> Result<Token, QuoteError> {
        if let Some(token) = self.valid_stored_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.valid_stored_token().await {
            debug!("Token became available while waiting for refresh");
            return Ok(token);
        }

        self.fetch_token_locked().await
    }

    /// Unconditionally fetch a new token from the auth endpoint
    pub async fn fetch_token(&self) -> Result<Token, QuoteError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_token_locked().await
    }

    /// Replace a token the quote endpoint rejected.
    ///
    /// If another request already swapped in a different valid token, that one
    /// is returned without a network call.
    pub async fn refresh_after_rejection(&self, rejected: &Token) -> Result<Token, QuoteError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.valid_stored_token().await
            && current.value != rejected.value
        {
            debug!("Token already refreshed by a concurrent request");
            return Ok(current);
        }

        self.store.clear().await;
        self.fetch_token_locked().await
    }

    /// Count a refreshed token the quote endpoint still rejected
    pub async fn record_rejection(&self) -> CircuitBreakerState {
        self.circuit_breaker.record_failure().await
    }

    pub async fn breaker_state(&self) -> CircuitBreakerState {
        self.circuit_breaker.get_state().await
    }

    pub async fn is_circuit_open(&self) -> bool {
        !self.circuit_breaker.can_proceed().await
    }

    /// Explicit user reset: closes the breaker so the next fetch hits the network
    pub async fn reset(&self) {
        self.circuit_breaker.force_close().await;
    }

    async fn valid_stored_token(&self) -> Option<Token> {
        self.store.get().await.filter(Token::is_valid)
    }

    async fn fetch_token_locked(&self) -> Result<Token, QuoteError> {
        let state = self.circuit_breaker.get_state().await;
        if state.is_open() {
            debug!("Auth circuit open, skipping token fetch");
            return Err(QuoteError::AuthCircuitOpen {
                failures: state.failures(),
            });
        }

        info!("Fetching new auth token from {}", self.config.auth_url);

        match self.request_token().await {
            Ok(value) => {
                let token = self.store.set(value, self.config.token_ttl).await;
                info!("Auth token acquired (expires {})", token.expiry);
                Ok(token)
            }
            Err(reason) => {
                let state = self.circuit_breaker.record_failure().await;
                if state.is_open() {
                    error!("Error fetching auth token: {}", reason);
                } else {
                    warn!(
                        "Error fetching auth token ({} of {}): {}",
                        state.failures(),
                        self.circuit_breaker.threshold(),
                        reason
                    );
                }
                Err(QuoteError::AuthFetchFailed {
                    reason,
                    failures: state.failures(),
                })
            }
        }
    }

    async fn request_token(&self) -> Result<String, String> {
        let request =
            HttpRequest::get(&self.config.auth_url).with_timeout(self.config.request_timeout);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.to_string())?;
        debug!("Auth response received: {}", response.status);

        if !response.is_success() {
            return Err(format!("auth endpoint returned HTTP {}", response.status));
        }

        let body = response
            .parse_json()
            .map_err(|e| format!("malformed auth response: {}", e))?;

        body.get(&self.config.token_field)
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("no '{}' in auth response", self.config.token_field))
    }
}
