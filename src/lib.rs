//! # Quotedeck
//!
//! Fetches and tracks insurance quotes from a token-protected quoting API.
//! Input changes are diffed against the previous snapshot, mapped to the
//! products they affect, debounced, and fetched concurrently with token
//! refresh, retry and a circuit breaker on repeated auth failures.
//!
//! ## Architecture Overview
//!
//! - **[`auth`]**: Token storage, the auth gateway with its circuit breaker,
//!   and the authenticated requester
//! - **[`quote`]**: Trigger matrix, response normalization, debouncing and the
//!   quote orchestrator
//! - **[`http`]**: The HTTP transport seam and its reqwest implementation
//! - **[`integration`]**: Wiring of the full stack from configuration
//! - **[`cli`]**: Argument parsing, configuration discovery and console output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quotedeck::{PlanSelection, QuoteDeckConfig, QuoteDeckSystem, SystemOptions, UserInput};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let system = QuoteDeckSystem::new(
//!         QuoteDeckConfig::default(),
//!         SystemOptions::default(),
//!         UserInput::default(),
//!     )
//!     .await?;
//!
//!     let report = system.quote_once(&PlanSelection::default()).await;
//!     println!("Weekly total: {}", report.summary.total_display());
//!     Ok(())
//! }
//! ```

/// Token-based authentication for the quoting API.
///
/// Holds the persisted token and failure counter, guards token fetches with a
/// circuit breaker, and retries quote requests with refresh and backoff.
pub mod auth;

/// Quote orchestration.
///
/// Input diffing, the product trigger matrix, response normalization and
/// debounced concurrent batches.
pub mod quote;

/// HTTP transport abstraction.
pub mod http;

/// Full-stack wiring from configuration.
pub mod integration;

/// Environment constants and path utilities.
///
/// Centralizes all hardcoded paths, endpoints and protocol constants used
/// throughout the application for easier maintenance and consistency.
pub mod env;

/// Error types shared by the auth and quote layers.
pub mod error;

// CLI module for command-line interface
pub mod cli;

pub use auth::{AuthGateway, AuthenticatedRequester, FileTokenStore, MemoryTokenStore, TokenStore};
pub use cli::{ConfigDiscovery, Environment, QuoteDeckConfig};
pub use error::QuoteError;
pub use http::{HttpTransport, ReqwestTransport};
pub use integration::{QuoteDeckSystem, QuoteReport, SystemOptions, SystemStatus};
pub use quote::{
    PlanSelection, ProductKey, Quote, QuoteOrchestrator, QuoteView, TriggerMatrix, UserInput,
};
