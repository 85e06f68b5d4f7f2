//! End-to-end quote flows over a scripted transport and a file-backed token
//! store.

use quotedeck::cli::{Environment, QuoteDeckConfig};
use quotedeck::http::{MockReply, MockTransport};
use quotedeck::quote::{InputField, OrchestratorPhase};
use quotedeck::{
    FileTokenStore, PlanSelection, QuoteDeckSystem, SystemOptions, TokenStore, UserInput,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const AUTH: &str = "https://auth.test/prod/auth";
const QUOTES: &str = "https://quotes.test/prod/quote";

fn config() -> QuoteDeckConfig {
    let mut config = QuoteDeckConfig::default();
    config.endpoints.production.auth_url = AUTH.to_string();
    config.endpoints.production.quote_url = QUOTES.to_string();
    config.orchestrator.auth_retry_delay_ms = 10;
    config.orchestrator.debounce_ms = 50;
    config.retry.initial_delay_ms = 5;
    config
}

fn scripted_transport() -> Arc<MockTransport> {
    let transport = Arc::new(MockTransport::new());
    transport.set_fallback(AUTH, MockReply::json(200, json!({ "access_token": "persisted" })));
    transport.set_fallback("/ltd/", MockReply::json(200, json!({ "premium": { "individual": 28.21 } })));
    transport.set_fallback(
        "/life/",
        MockReply::json(200, json!({ "plans": { "basic": { "individual": 3.1 } } })),
    );
    transport.set_fallback(QUOTES, MockReply::json(200, json!({ "price": "$1.00/week" })));
    transport
}

async fn system_at(
    token_path: &Path,
    transport: Arc<MockTransport>,
    input: UserInput,
) -> (QuoteDeckSystem, Arc<FileTokenStore>) {
    let store = Arc::new(FileTokenStore::open(token_path).await);
    let system = QuoteDeckSystem::with_parts(
        config(),
        SystemOptions {
            environment: Some(Environment::Production),
            ephemeral: false,
        },
        input,
        transport,
        store.clone(),
    )
    .unwrap();
    (system, store)
}

#[tokio::test]
async fn test_token_is_reused_across_restarts() {
    let temp_dir = TempDir::new().unwrap();
    let token_path = temp_dir.path().join(".quotedeck").join("auth.json");

    let transport = scripted_transport();
    let (system, _) = system_at(&token_path, transport.clone(), UserInput::default()).await;
    let report = system.quote_once(&PlanSelection::default()).await;
    assert_eq!(report.view.phase, OrchestratorPhase::Ready);
    assert_eq!(transport.request_count(AUTH), 1);
    assert!(token_path.exists());

    // Second launch with the same record: no new token fetch
    let transport = scripted_transport();
    let (system, store) = system_at(&token_path, transport.clone(), UserInput::default()).await;
    assert!(store.is_valid().await);
    system.quote_once(&PlanSelection::default()).await;
    assert_eq!(transport.request_count(AUTH), 0);

    let bearer = transport
        .requests()
        .iter()
        .find(|r| r.url.starts_with(QUOTES))
        .and_then(|r| r.header("Authorization").map(str::to_string));
    assert_eq!(bearer.as_deref(), Some("Bearer persisted"));
}

#[tokio::test]
async fn test_open_breaker_survives_restart_until_reset() {
    let temp_dir = TempDir::new().unwrap();
    let token_path = temp_dir.path().join("auth.json");

    let failing = Arc::new(MockTransport::new());
    failing.set_fallback(AUTH, MockReply::status(503));
    let (system, _) = system_at(&token_path, failing.clone(), UserInput::default()).await;
    assert_eq!(
        system.orchestrator().activate().await,
        OrchestratorPhase::AuthPending
    );
    assert_eq!(failing.request_count(AUTH), 3);

    // Relaunch: the persisted counter keeps the circuit open
    let transport = scripted_transport();
    let (system, store) = system_at(&token_path, transport.clone(), UserInput::default()).await;
    assert_eq!(store.failure_count().await, 3);
    let report = system.quote_once(&PlanSelection::default()).await;
    assert!(report.view.auth_broken);
    assert!(transport.requests().is_empty());

    system.reset_auth().await;
    let report = system.quote_once(&PlanSelection::default()).await;
    assert!(!report.view.auth_broken);
    assert_eq!(report.view.phase, OrchestratorPhase::Ready);
    assert_eq!(store.failure_count().await, 0);
    assert_eq!(transport.request_count(AUTH), 1);
}

#[tokio::test]
async fn test_summary_over_mixed_response_shapes() {
    let temp_dir = TempDir::new().unwrap();
    let transport = scripted_transport();
    let (system, _) = system_at(
        &temp_dir.path().join("auth.json"),
        transport,
        UserInput::default(),
    )
    .await;

    let report = system
        .quote_once(&PlanSelection::new(["ltd", "life", "dental"]))
        .await;

    assert_eq!(report.view.quote("ltd").unwrap().display_price, "$28.21/week");
    assert_eq!(report.view.quote("life").unwrap().weekly_amount, 3.1);
    assert_eq!(report.view.quote("dental").unwrap().display_price, "$1.00/week");
    assert_eq!(report.summary.total_weekly, 32.31);
    // 32.31 / (200000 / 2080)
    assert_eq!(report.summary.hours_of_work, Some(0.3));
}

#[tokio::test]
async fn test_live_edits_requote_affected_products() {
    let temp_dir = TempDir::new().unwrap();
    let transport = scripted_transport();
    let (system, _) = system_at(
        &temp_dir.path().join("auth.json"),
        transport.clone(),
        UserInput::default(),
    )
    .await;
    system.quote_once(&PlanSelection::default()).await;
    transport.clear_requests();

    let orchestrator = system.orchestrator();
    let input = orchestrator
        .current_input()
        .await
        .with_field(InputField::EmployeeCoverage, "$50,000")
        .unwrap();
    let outcome = orchestrator.update_input(input).await;
    assert_eq!(outcome.changed, BTreeSet::from([InputField::EmployeeCoverage]));

    let view = orchestrator.settled().await;
    assert!(view.error.is_none());

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![format!(
            "{}/life/?age=46&employeeCoverage=50000&spouseCoverage=10000&a=babrm",
            QUOTES
        )]
    );
}
