//! Runs against the real quoting endpoints. Opt in with `RUN_LIVE_TESTS=1`;
//! `QUOTEDECK_ENV` picks the environment.

use quotedeck::quote::OrchestratorPhase;
use quotedeck::{PlanSelection, QuoteDeckConfig, QuoteDeckSystem, SystemOptions, UserInput};
use serial_test::serial;
use test_tag::tag;

fn should_run_live_tests() -> bool {
    if let Ok(value) = std::env::var("RUN_LIVE_TESTS") {
        if value == "1" || value.eq_ignore_ascii_case("true") {
            return true;
        }
    }
    false
}

async fn live_system() -> QuoteDeckSystem {
    QuoteDeckSystem::new(
        QuoteDeckConfig::default(),
        SystemOptions {
            environment: None,
            ephemeral: true,
        },
        UserInput::default(),
    )
    .await
    .unwrap()
}

#[tokio::test]
#[tag(live)]
#[serial]
async fn test_live_default_quotes() {
    if !should_run_live_tests() {
        eprintln!("skipping live quote test: RUN_LIVE_TESTS not enabled");
        return;
    }

    let system = live_system().await;
    let report = system.quote_once(&PlanSelection::default()).await;

    assert_eq!(report.view.phase, OrchestratorPhase::Ready);
    assert!(!report.view.auth_broken);
    let quoted = report.view.quotes.values().filter(|q| q.is_some()).count();
    assert!(quoted > 0, "expected at least one quote, got {:?}", report.view);
    for quote in report.view.quotes.values().flatten() {
        assert!(quote.display_price.ends_with("/week"));
        assert!(quote.weekly_amount >= 0.0);
    }
}

#[tokio::test]
#[tag(live)]
#[serial]
async fn test_live_status_after_quote() {
    if !should_run_live_tests() {
        eprintln!("skipping live quote test: RUN_LIVE_TESTS not enabled");
        return;
    }

    let system = live_system().await;
    system.quote_once(&PlanSelection::new(["ltd"])).await;

    let status = system.status().await;
    assert!(status.token_present);
    assert!(status.token_valid);
    assert_eq!(status.failure_count, 0);
}
