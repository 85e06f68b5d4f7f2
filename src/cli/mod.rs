//! CLI-specific functionality for quotedeck
//!
//! This module contains all CLI-related code including argument parsing,
//! configuration discovery and console rendering of quote views.

pub mod args;
pub mod config;
pub mod console;

pub use args::{
    Args, AuthAction, AuthCommand, ConnectionOptions, ExecutionMode, InteractiveConfig,
    QuoteRunConfig,
};
pub use config::{ConfigDiscovery, Environment, QuoteDeckConfig};
pub use console::{InteractiveCommand, parse_interactive_line, render_report, render_status};
