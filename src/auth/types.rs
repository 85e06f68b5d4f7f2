use crate::env;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Bearer token with its expiry
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub expiry: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expiry,
        }
    }

    /// Token expiring `ttl` from now
    pub fn issue(value: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiry = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(value, expiry)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && now < self.expiry
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

// Token values never reach logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub auth_url: String,
    /// JSON field of the auth response carrying the token
    pub token_field: String,
    pub token_ttl: Duration,
    /// Consecutive failures after which the breaker opens
    pub max_failures: u32,
    pub request_timeout: Duration,
}

impl AuthConfig {
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            ..Default::default()
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_url: env::endpoints::PROD_AUTH_URL.to_string(),
            token_field: env::auth::DEFAULT_TOKEN_FIELD.to_string(),
            token_ttl: Duration::from_secs(env::auth::DEFAULT_TOKEN_TTL_SECS),
            max_failures: env::auth::MAX_AUTH_FAILURES,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub request_timeout: Duration,
}

impl RetryConfig {
    /// Delay before retry number `retry` (zero-based): initial * multiplier^retry
    pub fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0).powi(retry as i32);
        Duration::from_millis((self.initial_delay.as_millis() as f64 * multiplier) as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            request_timeout: Duration::from_secs(15),
        }
    }
}
