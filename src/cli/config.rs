//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./quotedeck.toml or ./.quotedeck/config.toml
//! 2. User config: ~/.quotedeck/config.toml
//! 3. System config: /etc/quotedeck/config.toml
//! 4. Built-in defaults
//!
//! The deployment environment comes from the file and can be overridden with
//! the `QUOTEDECK_ENV` variable.

use crate::auth::{AuthConfig, RetryConfig};
use crate::env;
use crate::quote::{OrchestratorConfig, PriceBasis, ProductKey, TriggerMatrix, TriggerSpec};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// `dev`/`development` select Development; anything else is Production
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// Value of `QUOTEDECK_ENV`, if set
    pub fn from_env() -> Option<Self> {
        std_env::var(env::ENVIRONMENT_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| Self::from_name(&value))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentEndpoints {
    pub auth_url: String,
    pub quote_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub development: EnvironmentEndpoints,
    pub production: EnvironmentEndpoints,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            development: EnvironmentEndpoints {
                auth_url: env::endpoints::DEV_AUTH_URL.to_string(),
                quote_url: env::endpoints::DEV_QUOTE_URL.to_string(),
            },
            production: EnvironmentEndpoints {
                auth_url: env::endpoints::PROD_AUTH_URL.to_string(),
                quote_url: env::endpoints::PROD_QUOTE_URL.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub token_ttl_secs: u64,
    pub max_failures: u32,
    pub token_field: String,
    pub request_timeout_ms: u64,
    /// Token record location; `~/.quotedeck/auth.json` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let defaults = AuthConfig::default();
        Self {
            token_ttl_secs: defaults.token_ttl.as_secs(),
            max_failures: defaults.max_failures,
            token_field: defaults.token_field,
            request_timeout_ms: defaults.request_timeout.as_millis() as u64,
            token_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub request_timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            backoff_multiplier: defaults.backoff_multiplier,
            request_timeout_ms: defaults.request_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub debounce_ms: u64,
    pub auth_retry_delay_ms: u64,
    pub price_basis: PriceBasis,
    pub app_tag: String,
    pub fetch_once: Vec<String>,
    pub requires_income: Vec<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            debounce_ms: defaults.debounce_window.as_millis() as u64,
            auth_retry_delay_ms: defaults.auth_retry_delay.as_millis() as u64,
            price_basis: defaults.price_basis,
            app_tag: defaults.app_tag,
            fetch_once: defaults.fetch_once.iter().map(ToString::to_string).collect(),
            requires_income: defaults
                .requires_income
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Complete on-disk configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteDeckConfig {
    pub environment: Environment,
    pub endpoints: EndpointsConfig,
    pub auth: AuthSettings,
    pub retry: RetrySettings,
    pub orchestrator: OrchestratorSettings,
    /// Trigger specs replacing or extending the standard matrix
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<TriggerSpec>,
}

impl QuoteDeckConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Configured environment, overridden by `QUOTEDECK_ENV`
    pub fn effective_environment(&self) -> Environment {
        Environment::from_env().unwrap_or(self.environment)
    }

    pub fn endpoints_for(&self, environment: Environment) -> &EnvironmentEndpoints {
        match environment {
            Environment::Development => &self.endpoints.development,
            Environment::Production => &self.endpoints.production,
        }
    }

    pub fn auth_config(&self, environment: Environment) -> AuthConfig {
        AuthConfig {
            auth_url: self.endpoints_for(environment).auth_url.clone(),
            token_field: self.auth.token_field.clone(),
            token_ttl: Duration::from_secs(self.auth.token_ttl_secs),
            max_failures: self.auth.max_failures,
            request_timeout: Duration::from_millis(self.auth.request_timeout_ms),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            request_timeout: Duration::from_millis(self.retry.request_timeout_ms),
        }
    }

    pub fn orchestrator_config(&self, environment: Environment) -> OrchestratorConfig {
        let settings = &self.orchestrator;
        OrchestratorConfig {
            quote_base_url: self.endpoints_for(environment).quote_url.clone(),
            app_tag: settings.app_tag.clone(),
            debounce_window: Duration::from_millis(settings.debounce_ms),
            auth_retry_delay: Duration::from_millis(settings.auth_retry_delay_ms),
            price_basis: settings.price_basis,
            fetch_once: settings.fetch_once.iter().map(ProductKey::new).collect(),
            requires_income: settings.requires_income.iter().map(ProductKey::new).collect(),
        }
    }

    /// Standard matrix with the configured product specs applied
    pub fn trigger_matrix(&self) -> anyhow::Result<TriggerMatrix> {
        TriggerMatrix::standard()
            .with_overrides(self.products.clone())
            .context("Invalid [[products]] configuration")
    }

    /// Configured token file, else the default under the home directory
    pub fn token_file_path(&self) -> Option<PathBuf> {
        self.auth
            .token_file
            .clone()
            .or_else(|| env::home_dir().map(|home| env::token_file_path(&home)))
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> anyhow::Result<QuoteDeckConfig> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return QuoteDeckConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(QuoteDeckConfig::default())
    }

    /// Load an explicit file, or fall back to discovery
    pub fn load(config_override: Option<&Path>) -> anyhow::Result<QuoteDeckConfig> {
        match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                QuoteDeckConfig::from_toml_file(path)
            }
            None => Self::discover_config(),
        }
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    pub fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = env::home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/quotedeck/config.toml"));

        candidates
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_runtime_defaults() {
        let config = QuoteDeckConfig::default();
        let auth = config.auth_config(Environment::Production);
        let retry = config.retry_config();
        let orchestrator = config.orchestrator_config(Environment::Production);

        assert_eq!(auth.auth_url, env::endpoints::PROD_AUTH_URL);
        assert_eq!(auth.max_failures, 3);
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(500));
        assert_eq!(orchestrator.debounce_window, Duration::from_millis(500));
        assert_eq!(orchestrator.auth_retry_delay, Duration::from_secs(3));
        assert!(orchestrator.fetch_once.contains(&ProductKey::from("accident")));
        assert!(orchestrator.requires_income.contains(&ProductKey::from("std")));
    }

    #[test]
    fn test_environment_names() {
        assert_eq!(Environment::from_name("dev"), Environment::Development);
        assert_eq!(Environment::from_name("Development"), Environment::Development);
        assert_eq!(Environment::from_name("prod"), Environment::Production);
        assert_eq!(Environment::from_name("staging"), Environment::Production);
    }

    #[test]
    fn test_development_endpoints() {
        let config = QuoteDeckConfig::default();
        assert_eq!(
            config.orchestrator_config(Environment::Development).quote_base_url,
            env::endpoints::DEV_QUOTE_URL
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = QuoteDeckConfig::default();
        let toml_string = toml::to_string(&config).unwrap();
        let deserialized: QuoteDeckConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut original = QuoteDeckConfig::default();
        original.orchestrator.debounce_ms = 250;
        original.to_toml_file(&config_path).unwrap();

        let loaded = QuoteDeckConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(loaded.orchestrator.debounce_ms, 250);
    }

    #[test]
    fn test_config_candidates() {
        let candidates = ConfigDiscovery::get_config_candidates();
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].file_name().unwrap(), "quotedeck.toml");
    }
}
