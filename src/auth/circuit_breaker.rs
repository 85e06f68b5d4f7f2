use crate::auth::token_store::TokenStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Breaker state derived from the persisted failure counter.
///
/// There is no half-open state and no timeout: an open breaker only closes
/// through [`CircuitBreaker::force_close`], i.e. explicit user acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitBreakerState {
    Closed { failures: u32 },
    Open { failures: u32 },
}

impl CircuitBreakerState {
    pub fn failures(&self) -> u32 {
        match self {
            CircuitBreakerState::Closed { failures } | CircuitBreakerState::Open { failures } => {
                *failures
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerState::Open { .. })
    }
}

pub struct CircuitBreaker {
    threshold: u32,
    store: Arc<dyn TokenStore>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, store: Arc<dyn TokenStore>) -> Self {
        Self {
            threshold: threshold.max(1),
            store,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn state_for(&self, failures: u32) -> CircuitBreakerState {
        if failures >= self.threshold {
            CircuitBreakerState::Open { failures }
        } else {
            CircuitBreakerState::Closed { failures }
        }
    }

    pub async fn can_proceed(&self) -> bool {
        !self.get_state().await.is_open()
    }

    pub async fn record_failure(&self) -> CircuitBreakerState {
        let failures = self.store.record_failure().await;
        let state = self.state_for(failures);

        if failures == self.threshold {
            warn!(
                "Auth circuit breaker opened after {} consecutive failures",
                failures
            );
        }

        state
    }

    /// Close the breaker after the user acknowledged the auth error
    pub async fn force_close(&self) {
        self.store.reset_failures().await;
        info!("Auth circuit breaker reset");
    }

    pub async fn get_state(&self) -> CircuitBreakerState {
        self.state_for(self.store.failure_count().await)
    }
}
