use quotedeck::cli::{ConfigDiscovery, Environment, QuoteDeckConfig};
use quotedeck::http::{MockReply, MockTransport};
use quotedeck::quote::{InputField, PriceBasis, ProductKey};
use quotedeck::{MemoryTokenStore, PlanSelection, QuoteDeckSystem, SystemOptions, UserInput};
use serde_json::json;
use serial_test::serial;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

const CUSTOM_CONFIG: &str = r#"
environment = "development"

[endpoints.development]
auth_url = "https://auth.test/dev/auth"
quote_url = "https://quotes.test/dev/quote"

[auth]
max_failures = 5
token_ttl_secs = 600

[retry]
max_retries = 2
initial_delay_ms = 100

[orchestrator]
debounce_ms = 250
price_basis = "monthly"
fetch_once = []

[[products]]
product = "pet"
triggers = ["zipCode"]

[products.path]
segment = "pet"
params = [{ name = "zip", field = "zipCode" }]
"#;

/// Restores `QUOTEDECK_ENV` when dropped
struct EnvGuard(Option<String>);

impl EnvGuard {
    fn set(value: Option<&str>) -> Self {
        let previous = std::env::var("QUOTEDECK_ENV").ok();
        // Tests touching the environment run under #[serial]
        unsafe {
            match value {
                Some(value) => std::env::set_var("QUOTEDECK_ENV", value),
                None => std::env::remove_var("QUOTEDECK_ENV"),
            }
        }
        Self(previous)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            match &self.0 {
                Some(value) => std::env::set_var("QUOTEDECK_ENV", value),
                None => std::env::remove_var("QUOTEDECK_ENV"),
            }
        }
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Should be able to create temporary file");
    fs::write(file.path(), contents).expect("Should be able to write config");
    file
}

#[test]
#[serial]
fn test_partial_config_keeps_defaults() {
    let _env = EnvGuard::set(None);
    let file = write_config(CUSTOM_CONFIG);
    let config = QuoteDeckConfig::from_toml_file(file.path()).unwrap();

    assert_eq!(config.effective_environment(), Environment::Development);

    let auth = config.auth_config(Environment::Development);
    assert_eq!(auth.auth_url, "https://auth.test/dev/auth");
    assert_eq!(auth.max_failures, 5);
    assert_eq!(auth.token_ttl, Duration::from_secs(600));
    assert_eq!(auth.token_field, "access_token");

    let retry = config.retry_config();
    assert_eq!(retry.max_retries, 2);
    assert_eq!(retry.backoff_multiplier, 2.0);

    let orchestrator = config.orchestrator_config(Environment::Development);
    assert_eq!(orchestrator.debounce_window, Duration::from_millis(250));
    assert_eq!(orchestrator.price_basis, PriceBasis::Monthly);
    assert!(orchestrator.fetch_once.is_empty());
    assert!(orchestrator.requires_income.contains(&ProductKey::from("std")));
    assert_eq!(orchestrator.app_tag, "babrm");

    // production endpoints untouched
    assert!(config.endpoints.production.quote_url.contains("/prod/quote"));
}

#[test]
fn test_products_extend_the_matrix() {
    let file = write_config(CUSTOM_CONFIG);
    let config = QuoteDeckConfig::from_toml_file(file.path()).unwrap();
    let matrix = config.trigger_matrix().unwrap();

    assert_eq!(matrix.len(), 11);
    let affected = matrix.affected_by(&[InputField::ZipCode].into());
    assert!(affected.contains(&ProductKey::from("pet")));

    let path = matrix
        .build_path(&ProductKey::from("pet"), &UserInput::default())
        .unwrap();
    assert_eq!(path, "/pet/?zip=07073");
}

#[test]
fn test_invalid_product_config_is_rejected() {
    let file = write_config(
        r#"
[[products]]
product = "pet"
triggers = []

[products.path]
segment = "pet"
"#,
    );
    let config = QuoteDeckConfig::from_toml_file(file.path()).unwrap();
    assert!(config.trigger_matrix().is_err());
}

#[test]
fn test_malformed_toml_reports_path() {
    let file = write_config("environment = [");
    let error = QuoteDeckConfig::from_toml_file(file.path()).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse config file"));

    let missing = ConfigDiscovery::load(Some(std::path::Path::new("/nonexistent/quotedeck.toml")));
    assert!(missing.is_err());
}

#[test]
#[serial]
fn test_environment_variable_overrides_file() {
    let file = write_config(CUSTOM_CONFIG);
    let config = QuoteDeckConfig::from_toml_file(file.path()).unwrap();

    let _env = EnvGuard::set(Some("prod"));
    assert_eq!(config.effective_environment(), Environment::Production);

    let _env = EnvGuard::set(Some("dev"));
    assert_eq!(
        QuoteDeckConfig::default().effective_environment(),
        Environment::Development
    );
}

#[test]
fn test_config_roundtrip_with_products() {
    let file = write_config(CUSTOM_CONFIG);
    let config = QuoteDeckConfig::from_toml_file(file.path()).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let saved = temp_dir.path().join("quotedeck.toml");
    config.to_toml_file(&saved).unwrap();

    let reloaded = QuoteDeckConfig::from_toml_file(&saved).unwrap();
    assert_eq!(reloaded, config);
}

#[tokio::test(start_paused = true)]
async fn test_system_uses_configured_environment_and_basis() {
    let file = write_config(CUSTOM_CONFIG);
    let config = QuoteDeckConfig::from_toml_file(file.path()).unwrap();

    let transport = Arc::new(MockTransport::new());
    transport.set_fallback("/dev/auth", MockReply::json(200, json!({ "access_token": "dev" })));
    transport.set_fallback(
        "/dev/quote",
        MockReply::json(200, json!({ "premium": { "individual": 40.0 } })),
    );

    let system = QuoteDeckSystem::with_parts(
        config,
        SystemOptions {
            environment: Some(Environment::Development),
            ephemeral: true,
        },
        UserInput::default(),
        transport.clone(),
        Arc::new(MemoryTokenStore::new()),
    )
    .unwrap();

    let report = system.quote_once(&PlanSelection::new(["ltd", "pet"])).await;

    // monthly 40.00 becomes weekly 10.00
    assert_eq!(report.view.quote("ltd").unwrap().display_price, "$10.00/week");
    assert_eq!(report.summary.total_weekly, 20.0);
    assert_eq!(transport.request_count("/dev/quote/pet/?zip=07073&a=babrm"), 1);
}
