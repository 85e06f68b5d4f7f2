//! Environment constants and path utilities for quotedeck.
//!
//! This module centralizes hardcoded paths, environment variable names and
//! protocol constants used throughout the application, making them easier to
//! maintain and modify.

/// Main application directory name (hidden directory like .git, .vscode)
pub const QUOTEDECK_DIR_NAME: &str = ".quotedeck";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "quotedeck.toml";

/// Environment variable selecting the deployment environment (`dev` / `prod`)
pub const ENVIRONMENT_VAR: &str = "QUOTEDECK_ENV";

/// Auth-related constants
pub mod auth {
    /// File holding the persisted token record
    pub const TOKEN_FILE_NAME: &str = "auth.json";

    /// JSON field carrying the bearer token in the auth response
    pub const DEFAULT_TOKEN_FIELD: &str = "access_token";

    /// Default token lifetime in seconds
    pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

    /// Consecutive auth failures after which the breaker opens
    pub const MAX_AUTH_FAILURES: u32 = 3;
}

/// Quote endpoint constants
pub mod quote {
    /// Application tag appended to every quote request as `a=<tag>`
    pub const APP_TAG: &str = "babrm";

    /// Debounce window for input changes, in milliseconds
    pub const DEBOUNCE_DELAY_MS: u64 = 500;

    /// Delay between activation attempts while auth is pending, in milliseconds
    pub const AUTH_RETRY_DELAY_MS: u64 = 3000;

    /// Number of leading zip code digits that identify a pricing region
    pub const ZIP_REGION_PREFIX_LEN: usize = 3;

    /// Working hours per year used for the "hours of work" figure
    pub const WORK_HOURS_PER_YEAR: f64 = 2080.0;
}

/// Default service endpoints per environment
pub mod endpoints {
    pub const DEV_AUTH_URL: &str = "https://ltfuhej4l0.execute-api.us-east-1.amazonaws.com/dev/auth";
    pub const PROD_AUTH_URL: &str =
        "https://9t1c2qgm8j.execute-api.us-east-1.amazonaws.com/prod/auth";
    pub const DEV_QUOTE_URL: &str =
        "https://5kfkw0uyea.execute-api.us-east-1.amazonaws.com/dev/quote";
    pub const PROD_QUOTE_URL: &str =
        "https://ubucgvtxog.execute-api.us-east-1.amazonaws.com/prod/quote";
}

/// Common path utilities
use std::path::{Path, PathBuf};

/// Build the main .quotedeck directory path from a base directory
pub fn quotedeck_dir_path(base: &Path) -> PathBuf {
    base.join(QUOTEDECK_DIR_NAME)
}

/// Build the token record path in the user's home directory
pub fn token_file_path(home_dir: &Path) -> PathBuf {
    quotedeck_dir_path(home_dir).join(auth::TOKEN_FILE_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    quotedeck_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    quotedeck_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Resolve the user's home directory from the environment
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_construction() {
        let home = Path::new("/home/user");

        assert_eq!(quotedeck_dir_path(home), Path::new("/home/user/.quotedeck"));
        assert_eq!(
            token_file_path(home),
            Path::new("/home/user/.quotedeck/auth.json")
        );
    }

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.quotedeck/config.toml")
        );

        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/.quotedeck/config.toml")
        );
    }
}
