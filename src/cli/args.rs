//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `quote`: Fetch quotes for one set of inputs and print them
//! - `interactive`: Read `field=value` changes from stdin and re-quote live
//! - `auth`: Inspect or reset the persisted token record
//! - `show-config`: Show configuration discovery information

use crate::quote::{InputField, PlanSelection, ProductKey, UrlParams, UserInput};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Quote(QuoteRunConfig),
    Interactive(InteractiveConfig),
    Auth(AuthCommand),
    ShowConfig,
}

/// Options shared by every command that talks to the quoting API
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub config_override: Option<PathBuf>,
    pub environment: Option<String>,
    /// Keep the token in memory only
    pub ephemeral: bool,
}

#[derive(Debug)]
pub struct QuoteRunConfig {
    pub connection: ConnectionOptions,
    pub input: UserInput,
    pub selection: PlanSelection,
    pub json: bool,
}

#[derive(Debug)]
pub struct InteractiveConfig {
    pub connection: ConnectionOptions,
    pub input: UserInput,
    pub selection: PlanSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum AuthAction {
    /// Show the token record and breaker state
    Status,
    /// Close the breaker after repeated auth failures
    Reset,
    /// Forget the stored token
    Clear,
}

#[derive(Debug)]
pub struct AuthCommand {
    pub connection: ConnectionOptions,
    pub action: AuthAction,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConnectionArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Environment override (dev or prod)
    #[arg(long = "env", global = true)]
    pub env: Option<String>,
    /// Do not read or persist the auth token
    #[arg(long = "ephemeral", global = true)]
    pub ephemeral: bool,
}

impl From<&ConnectionArgs> for ConnectionOptions {
    fn from(args: &ConnectionArgs) -> Self {
        Self {
            config_override: args.config.clone(),
            environment: args.env.clone(),
            ephemeral: args.ephemeral,
        }
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct InputArgs {
    /// Applicant age
    #[arg(long = "age")]
    pub age: Option<u32>,
    /// Five-digit zip code
    #[arg(long = "zip")]
    pub zip: Option<String>,
    /// Annual income, e.g. 85000 or "$85,000"
    #[arg(long = "income")]
    pub income: Option<String>,
    /// Employee life coverage amount
    #[arg(long = "employee-coverage")]
    pub employee_coverage: Option<String>,
    /// Spouse life coverage amount
    #[arg(long = "spouse-coverage")]
    pub spouse_coverage: Option<String>,
    /// Seed inputs from a page URL (zipCode, age, annualSalary parameters)
    #[arg(long = "from-url", value_name = "URL")]
    pub from_url: Option<String>,
    /// Products included in the plan total (comma separated)
    #[arg(long = "select", value_delimiter = ',', value_name = "PRODUCTS")]
    pub select: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "quotedeck")]
#[command(author = "Quotedeck Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch and track insurance quotes from the quoting API")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch quotes once and print them
    Quote {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Print the result as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Read field=value lines from stdin and re-quote as inputs change
    Interactive {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Manage the stored auth token
    Auth {
        #[command(subcommand)]
        action: AuthAction,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Quote {
                input,
                connection,
                json,
            }) => Ok(ExecutionMode::Quote(QuoteRunConfig {
                connection: connection.into(),
                input: input.to_user_input()?,
                selection: input.selection(),
                json: *json,
            })),
            Some(Commands::Interactive { input, connection }) => {
                Ok(ExecutionMode::Interactive(InteractiveConfig {
                    connection: connection.into(),
                    input: input.to_user_input()?,
                    selection: input.selection(),
                }))
            }
            Some(Commands::Auth { action, connection }) => Ok(ExecutionMode::Auth(AuthCommand {
                connection: connection.into(),
                action: *action,
            })),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'quotedeck --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}

impl InputArgs {
    /// Defaults, then URL parameters, then explicit flags
    pub fn to_user_input(&self) -> Result<UserInput, String> {
        let mut input = UserInput::default();

        if let Some(url) = &self.from_url {
            input = UrlParams::parse(url).apply_to(&input);
        }

        if let Some(age) = self.age {
            input.age = age;
        }
        let fields = [
            (InputField::ZipCode, self.zip.as_deref()),
            (InputField::AnnualIncome, self.income.as_deref()),
            (InputField::EmployeeCoverage, self.employee_coverage.as_deref()),
            (InputField::SpouseCoverage, self.spouse_coverage.as_deref()),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                input = input.with_field(field, value).map_err(|e| e.to_string())?;
            }
        }

        input.validate().map_err(|e| e.to_string())?;
        Ok(input)
    }

    pub fn selection(&self) -> PlanSelection {
        if self.select.is_empty() {
            PlanSelection::default()
        } else {
            PlanSelection::new(self.select.iter().map(ProductKey::new))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_command_from_flags() {
        let args = Args::try_parse_from([
            "quotedeck",
            "quote",
            "--age",
            "35",
            "--zip",
            "10001",
            "--income",
            "$85,000",
            "--select",
            "ltd,dental",
            "--json",
            "--ephemeral",
        ])
        .unwrap();

        let ExecutionMode::Quote(config) = args.mode().unwrap() else {
            panic!("Expected Quote mode");
        };
        assert_eq!(config.input.age, 35);
        assert_eq!(config.input.zip_code, "10001");
        assert_eq!(config.input.annual_income, 85_000.0);
        assert!(config.json);
        assert!(config.connection.ephemeral);
        assert!(config.selection.is_enabled(&ProductKey::from("dental")));
        assert!(!config.selection.is_enabled(&ProductKey::from("std")));
    }

    #[test]
    fn test_flags_override_url_parameters() {
        let args = Args::try_parse_from([
            "quotedeck",
            "quote",
            "--from-url",
            "https://example.com/?zipCode=94105&age=61&annualSalary=70000",
            "--age",
            "40",
        ])
        .unwrap();

        let ExecutionMode::Quote(config) = args.mode().unwrap() else {
            panic!("Expected Quote mode");
        };
        assert_eq!(config.input.age, 40);
        assert_eq!(config.input.zip_code, "94105");
        assert_eq!(config.input.annual_income, 70_000.0);
    }

    #[test]
    fn test_invalid_zip_is_rejected() {
        let args = Args::try_parse_from(["quotedeck", "quote", "--zip", "123"]).unwrap();
        assert!(args.mode().is_err());
    }

    #[test]
    fn test_auth_subcommand() {
        let args = Args::try_parse_from(["quotedeck", "auth", "reset", "--env", "dev"]).unwrap();
        let ExecutionMode::Auth(command) = args.mode().unwrap() else {
            panic!("Expected Auth mode");
        };
        assert_eq!(command.action, AuthAction::Reset);
        assert_eq!(command.connection.environment.as_deref(), Some("dev"));
    }

    #[test]
    fn test_interactive_command() {
        let args = Args::try_parse_from(["quotedeck", "interactive"]).unwrap();
        let ExecutionMode::Interactive(config) = args.mode().unwrap() else {
            panic!("Expected Interactive mode");
        };
        assert_eq!(config.input, UserInput::default());
        assert_eq!(config.selection, PlanSelection::default());
    }

    #[test]
    fn test_no_command_error() {
        let args = Args { command: None };
        assert!(args.mode().is_err());
    }
}
