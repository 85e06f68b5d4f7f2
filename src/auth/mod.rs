//! Token-based auth for the quoting API.
//!
//! [`TokenStore`] holds the bearer token and the consecutive-failure counter,
//! [`AuthGateway`] acquires tokens behind a [`CircuitBreaker`], and
//! [`AuthenticatedRequester`] attaches tokens to quote requests with
//! refresh-on-401 and exponential backoff.

pub mod circuit_breaker;
pub mod gateway;
pub mod requester;
pub mod token_store;
pub mod types;


pub use circuit_breaker::{CircuitBreaker, CircuitBreakerState};
pub use gateway::AuthGateway;
pub use requester::AuthenticatedRequester;
pub use token_store::{AuthRecord, FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::*;
