//! # System Wiring
//!
//! Builds the full quote stack from a [`QuoteDeckConfig`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               QuoteDeckSystem                │
//! │  ┌────────────┐ ┌────────────┐ ┌───────────┐ │
//! │  │ TokenStore │→│ AuthGateway│→│ Requester │ │
//! │  └────────────┘ └────────────┘ └─────┬─────┘ │
//! │                        QuoteOrchestrator ◄───┘│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The CLI talks to this type only; tests construct it over a scripted
//! transport with [`QuoteDeckSystem::with_parts`].

use crate::auth::{
    AuthGateway, AuthenticatedRequester, FileTokenStore, MemoryTokenStore, TokenStore,
};
use crate::cli::config::{Environment, QuoteDeckConfig};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::quote::{
    PlanSelection, QuoteOrchestrator, QuoteSummary, QuoteView, UserInput, summarize,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct SystemOptions {
    /// Takes precedence over both the file and `QUOTEDECK_ENV`
    pub environment: Option<Environment>,
    /// Use an in-memory token store
    pub ephemeral: bool,
}

/// Auth state as reported by `quotedeck auth status`
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub environment: Environment,
    pub auth_url: String,
    pub quote_url: String,
    pub token_file: Option<PathBuf>,
    pub token_present: bool,
    pub token_valid: bool,
    pub token_expiry: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub breaker_open: bool,
}

/// Result of a one-shot quote run
#[derive(Debug, Clone, Serialize)]
pub struct QuoteReport {
    pub input: UserInput,
    pub view: QuoteView,
    pub summary: QuoteSummary,
}

pub struct QuoteDeckSystem {
    environment: Environment,
    config: QuoteDeckConfig,
    token_file: Option<PathBuf>,
    store: Arc<dyn TokenStore>,
    gateway: Arc<AuthGateway>,
    orchestrator: QuoteOrchestrator,
}

impl QuoteDeckSystem {
    /// Production wiring: reqwest transport and, unless ephemeral, the
    /// file-backed token store.
    pub async fn new(
        config: QuoteDeckConfig,
        options: SystemOptions,
        initial_input: UserInput,
    ) -> Result<Self> {
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new().context("Failed to initialize HTTP transport")?);

        let token_file = if options.ephemeral {
            None
        } else {
            config.token_file_path()
        };
        let store: Arc<dyn TokenStore> = match &token_file {
            Some(path) => Arc::new(FileTokenStore::open(path.clone()).await),
            None => Arc::new(MemoryTokenStore::new()),
        };

        let mut system = Self::with_parts(config, options, initial_input, transport, store)?;
        system.token_file = token_file;
        Ok(system)
    }

    pub fn with_parts(
        config: QuoteDeckConfig,
        options: SystemOptions,
        initial_input: UserInput,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let environment = options
            .environment
            .unwrap_or_else(|| config.effective_environment());
        info!(
            "Initializing quote system ({} environment, {} transport)",
            environment,
            transport.transport_name()
        );

        let gateway = Arc::new(AuthGateway::new(
            config.auth_config(environment),
            Arc::clone(&store),
            Arc::clone(&transport),
        ));
        let requester =
            AuthenticatedRequester::new(Arc::clone(&gateway), transport, config.retry_config());
        let orchestrator = QuoteOrchestrator::new(
            config.orchestrator_config(environment),
            config.trigger_matrix()?,
            requester,
            initial_input,
        );

        Ok(Self {
            environment,
            config,
            token_file: None,
            store,
            gateway,
            orchestrator,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> &QuoteDeckConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &QuoteOrchestrator {
        &self.orchestrator
    }

    /// Activate, wait for the initial batch, and total the selection
    pub async fn quote_once(&self, selection: &PlanSelection) -> QuoteReport {
        self.orchestrator.activate().await;
        let view = self.orchestrator.settled().await;
        self.report(view, selection).await
    }

    pub async fn report(&self, view: QuoteView, selection: &PlanSelection) -> QuoteReport {
        let input = self.orchestrator.current_input().await;
        let summary = summarize(&view.quotes, selection, input.annual_income);
        QuoteReport {
            input,
            view,
            summary,
        }
    }

    pub async fn status(&self) -> SystemStatus {
        let record = self.store.record().await;
        let endpoints = self.config.endpoints_for(self.environment);
        SystemStatus {
            environment: self.environment,
            auth_url: endpoints.auth_url.clone(),
            quote_url: endpoints.quote_url.clone(),
            token_file: self.token_file.clone(),
            token_present: record.token.is_some(),
            token_valid: record.token.as_ref().is_some_and(|token| token.is_valid()),
            token_expiry: record.token.as_ref().map(|token| token.expiry),
            failure_count: record.failure_count,
            breaker_open: self.gateway.is_circuit_open().await,
        }
    }

    /// Close the breaker and resume fetching
    pub async fn reset_auth(&self) {
        self.orchestrator.reset_auth().await;
    }

    /// Drop the stored token so the next request fetches a new one
    pub async fn clear_token(&self) {
        self.store.clear().await;
        info!("Stored auth token cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockReply, MockTransport};
    use serde_json::json;

    fn system(transport: Arc<MockTransport>) -> QuoteDeckSystem {
        let mut config = QuoteDeckConfig::default();
        config.endpoints.production.auth_url = "https://auth.test/prod/auth".to_string();
        config.endpoints.production.quote_url = "https://quotes.test/prod/quote".to_string();

        QuoteDeckSystem::with_parts(
            config,
            SystemOptions {
                environment: Some(Environment::Production),
                ephemeral: true,
            },
            UserInput::default(),
            transport,
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_once_reports_summary() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback("/prod/auth", MockReply::json(200, json!({ "access_token": "tok" })));
        transport.set_fallback("/prod/quote", MockReply::json(200, json!(10.0)));

        let system = system(transport.clone());
        let report = system.quote_once(&PlanSelection::default()).await;

        assert_eq!(report.summary.total_weekly, 60.0);
        assert_eq!(report.summary.lines.len(), 6);
        assert!(report.view.error.is_none());
        assert_eq!(transport.request_count("/prod/quote"), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_tracks_failures_and_reset() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback("/prod/auth", MockReply::status(500));

        let system = system(transport);
        system.orchestrator().activate().await;

        let status = system.status().await;
        assert!(status.breaker_open);
        assert_eq!(status.failure_count, 3);
        assert!(!status.token_present);

        system.reset_auth().await;
        let status = system.status().await;
        assert!(!status.breaker_open);
        assert_eq!(status.failure_count, 0);
    }
}
