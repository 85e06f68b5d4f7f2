use quotedeck::cli::{
    Args, AuthAction, AuthCommand, ConfigDiscovery, ConnectionOptions, Environment,
    ExecutionMode, InteractiveCommand, InteractiveConfig, QuoteRunConfig, parse_interactive_line,
    render_report, render_status,
};
use quotedeck::{PlanSelection, QuoteDeckSystem, SystemOptions, UserInput};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quotedeck=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Quote(config) => run_quote_mode(config).await,
        ExecutionMode::Interactive(config) => run_interactive_mode(config).await,
        ExecutionMode::Auth(command) => run_auth_command(command).await,
        ExecutionMode::ShowConfig => show_config(),
    }
}

async fn build_system(
    connection: &ConnectionOptions,
    input: UserInput,
) -> anyhow::Result<QuoteDeckSystem> {
    let config = ConfigDiscovery::load(connection.config_override.as_deref())?;
    let options = SystemOptions {
        environment: connection.environment.as_deref().map(Environment::from_name),
        ephemeral: connection.ephemeral,
    };
    QuoteDeckSystem::new(config, options, input).await
}

async fn run_quote_mode(config: QuoteRunConfig) -> anyhow::Result<()> {
    info!("Fetching quotes for {:?}", config.input);
    let system = build_system(&config.connection, config.input).await?;
    let report = system.quote_once(&config.selection).await;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    if report.view.auth_broken {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive_mode(config: InteractiveConfig) -> anyhow::Result<()> {
    let system = Arc::new(build_system(&config.connection, config.input).await?);
    let selection = Arc::new(Mutex::new(config.selection));

    println!("Authenticating and fetching initial quotes...");
    let report = system.quote_once(&*selection.lock().await).await;
    print!("{}", render_report(&report));
    show_interactive_help();

    let printer = {
        let system = Arc::clone(&system);
        let selection = Arc::clone(&selection);
        let mut rx = system.orchestrator().subscribe();
        tokio::spawn(async move {
            let mut busy = false;
            while rx.changed().await.is_ok() {
                let view = rx.borrow_and_update().clone();
                if !view.is_settled() {
                    busy = true;
                    continue;
                }
                if busy {
                    busy = false;
                    let report = system.report(view, &*selection.lock().await).await;
                    println!();
                    print!("{}", render_report(&report));
                    prompt();
                }
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_interactive_line(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{} (type 'help' for commands)", e);
                prompt();
                continue;
            }
        };

        match command {
            InteractiveCommand::Set { field, value } => {
                let current = system.orchestrator().current_input().await;
                match current.with_field(field, &value) {
                    Ok(input) => {
                        let outcome = system.orchestrator().update_input(input).await;
                        if outcome.scheduled.is_empty() {
                            println!("No quotes affected");
                        } else {
                            let products: Vec<_> =
                                outcome.scheduled.iter().map(|p| p.as_str()).collect();
                            println!("Re-quoting: {}", products.join(", "));
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            InteractiveCommand::Toggle(product) => {
                let mut selection = selection.lock().await;
                let enabled = !selection.is_enabled(&product);
                selection.toggle(product.clone(), enabled);
                println!(
                    "{} {}",
                    product,
                    if enabled { "added to plan" } else { "removed from plan" }
                );
            }
            InteractiveCommand::Show => {
                let view = system.orchestrator().snapshot();
                let report = system.report(view, &*selection.lock().await).await;
                print!("{}", render_report(&report));
            }
            InteractiveCommand::ResetAuth => {
                system.reset_auth().await;
                let report = system.quote_once(&*selection.lock().await).await;
                print!("{}", render_report(&report));
            }
            InteractiveCommand::Help => show_interactive_help(),
            InteractiveCommand::Quit => break,
            InteractiveCommand::Empty => {}
        }
        prompt();
    }

    printer.abort();
    println!("Goodbye!");
    Ok(())
}

async fn run_auth_command(command: AuthCommand) -> anyhow::Result<()> {
    let system = build_system(&command.connection, UserInput::default()).await?;

    match command.action {
        AuthAction::Status => {}
        AuthAction::Reset => {
            system.reset_auth().await;
            println!("Auth failure counter reset");
        }
        AuthAction::Clear => {
            system.clear_token().await;
            println!("Stored token cleared");
        }
    }

    print!("{}", render_status(&system.status().await));
    Ok(())
}

fn show_config() -> anyhow::Result<()> {
    ConfigDiscovery::show_discovery_info();

    let config = match ConfigDiscovery::discover_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    println!();
    println!("Effective environment: {}", config.effective_environment());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn show_interactive_help() {
    println!("Interactive Mode Commands:");
    println!("  <field>=<value>   - Change an input (age, zip, income, employeeCoverage, spouseCoverage)");
    println!("  toggle <product>  - Add or remove a product from the plan total");
    println!("  show              - Show the current quotes");
    println!("  reset             - Acknowledge an auth error and retry");
    println!("  help              - Show this help message");
    println!("  quit              - Exit the application");
}
