use crate::auth::gateway::AuthGateway;
use crate::auth::types::{RetryConfig, Token};
use crate::error::QuoteError;
use crate::http::{HttpRequest, HttpTransport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of a single transport attempt
enum Attempt {
    Success(Value),
    /// HTTP 401 or a connection-level failure
    AuthRejected(String),
    /// Anything else that failed: 5xx, other non-2xx, timeout, bad JSON
    Transient(String),
}

/// Issues quote requests with the current bearer token attached.
///
/// An auth rejection triggers exactly one token refresh and one retry. Other
/// failures back off exponentially up to `retry.max_retries` times.
pub struct AuthenticatedRequester {
    gateway: Arc<AuthGateway>,
    transport: Arc<dyn HttpTransport>,
    retry: RetryConfig,
}

impl AuthenticatedRequester {
    pub fn new(
        gateway: Arc<AuthGateway>,
        transport: Arc<dyn HttpTransport>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            gateway,
            transport,
            retry,
        }
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// GET `url` and return the parsed JSON body
    pub async fn request_json(&self, url: &str) -> Result<Value, QuoteError> {
        let breaker = self.gateway.breaker_state().await;
        if breaker.is_open() {
            return Err(QuoteError::AuthCircuitOpen {
                failures: breaker.failures(),
            });
        }

        let mut token = self.gateway.ensure_valid_token().await?;
        let mut refreshed = false;
        let mut retries = 0u32;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            debug!("Making authenticated request to {} (attempt {})", url, attempts);

            match self.attempt(url, &token).await {
                Attempt::Success(body) => return Ok(body),
                Attempt::AuthRejected(reason) => {
                    if refreshed {
                        return Err(self.auth_failure_after_refresh(url, reason).await);
                    }
                    warn!(
                        "Request to {} rejected ({}), refreshing token and retrying",
                        url, reason
                    );
                    token = self.gateway.refresh_after_rejection(&token).await?;
                    refreshed = true;
                }
                Attempt::Transient(reason) => {
                    if retries >= self.retry.max_retries {
                        error!(
                            "Request to {} failed after {} attempts: {}",
                            url, attempts, reason
                        );
                        return Err(QuoteError::RequestFailed {
                            url: url.to_string(),
                            attempts,
                            reason,
                        });
                    }

                    let delay = self.retry.delay_for(retries);
                    warn!(
                        "Request to {} failed ({}), retrying in {:?}",
                        url, reason, delay
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &str, token: &Token) -> Attempt {
        let request = HttpRequest::get(url)
            .with_bearer(&token.value)
            .with_header("Content-Type", "application/json")
            .with_timeout(self.retry.request_timeout);

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) if e.is_network() => return Attempt::AuthRejected(e.to_string()),
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        if response.is_unauthorized() {
            return Attempt::AuthRejected("HTTP 401".to_string());
        }
        if !response.is_success() {
            return Attempt::Transient(format!("HTTP {}", response.status));
        }

        match response.parse_json() {
            Ok(body) => Attempt::Success(body),
            Err(e) => Attempt::Transient(format!("malformed response body: {}", e)),
        }
    }

    async fn auth_failure_after_refresh(&self, url: &str, reason: String) -> QuoteError {
        let breaker = self.gateway.record_rejection().await;
        if breaker.is_open() {
            error!(
                "Request to {} rejected after token refresh, auth circuit open: {}",
                url, reason
            );
            QuoteError::AuthCircuitOpen {
                failures: breaker.failures(),
            }
        } else {
            error!(
                "Request to {} still rejected after token refresh: {}",
                url, reason
            );
            QuoteError::AuthFetchFailed {
                reason: format!("request still rejected after token refresh: {}", reason),
                failures: breaker.failures(),
            }
        }
    }
}
