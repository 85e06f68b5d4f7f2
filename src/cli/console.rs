//! Console rendering and interactive line parsing

use crate::integration::{QuoteReport, SystemStatus};
use crate::quote::{InputError, InputField, ProductKey};
use std::fmt::Write;

/// One line typed in interactive mode
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    /// `field=value`
    Set { field: InputField, value: String },
    /// `toggle <product>`
    Toggle(ProductKey),
    Show,
    ResetAuth,
    Help,
    Quit,
    Empty,
}

pub fn parse_interactive_line(line: &str) -> Result<InteractiveCommand, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(InteractiveCommand::Empty);
    }

    if let Some((field, value)) = line.split_once('=') {
        return Ok(InteractiveCommand::Set {
            field: field.parse()?,
            value: value.trim().to_string(),
        });
    }

    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("toggle"), Some(product)) => Ok(InteractiveCommand::Toggle(ProductKey::new(product))),
        (Some("show" | "status"), None) => Ok(InteractiveCommand::Show),
        (Some("reset"), None) => Ok(InteractiveCommand::ResetAuth),
        (Some("help"), None) => Ok(InteractiveCommand::Help),
        (Some("quit" | "exit"), None) => Ok(InteractiveCommand::Quit),
        _ => Err(InputError::UnknownField(line.to_string())),
    }
}

pub fn render_report(report: &QuoteReport) -> String {
    let mut out = String::new();
    let input = &report.input;
    let _ = writeln!(
        out,
        "Age {} | Zip {} | Income ${:.0} | Life coverage ${:.0} / ${:.0}",
        input.age,
        if input.zip_code.is_empty() { "-" } else { input.zip_code.as_str() },
        input.annual_income,
        input.employee_coverage,
        input.spouse_coverage
    );
    let _ = writeln!(out);

    for (product, quote) in &report.view.quotes {
        let price = match quote {
            Some(quote) => quote.display_price.clone(),
            None => "-".to_string(),
        };
        let marker = if report
            .summary
            .lines
            .iter()
            .any(|line| &line.product == product)
        {
            "*"
        } else {
            " "
        };
        let _ = write!(out, " {} {:<10} {:>16}", marker, product.as_str(), price);
        if let Some(reason) = report.view.failed_products.get(product) {
            let _ = write!(out, "  ({})", reason);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Selected total: {}", report.summary.total_display());
    if let Some(hours) = report.summary.hours_of_work {
        let _ = writeln!(out, "Hours of work per week: {:.1} hours", hours);
    }
    if let Some(error) = &report.view.error {
        let _ = writeln!(out, "Warning: {}", error);
    }
    if let Some(error) = &report.view.input_error {
        let _ = writeln!(out, "Input error: {}", error);
    }
    if report.view.auth_broken {
        let _ = writeln!(
            out,
            "Authentication is failing repeatedly. Run `reset` (or `quotedeck auth reset`) to retry."
        );
    }
    out
}

pub fn render_status(status: &SystemStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Environment:    {}", status.environment);
    let _ = writeln!(out, "Auth endpoint:  {}", status.auth_url);
    let _ = writeln!(out, "Quote endpoint: {}", status.quote_url);
    match &status.token_file {
        Some(path) => {
            let _ = writeln!(out, "Token file:     {:?}", path);
        }
        None => {
            let _ = writeln!(out, "Token file:     (in memory)");
        }
    }
    let token = match (status.token_present, status.token_valid, status.token_expiry) {
        (false, _, _) => "none".to_string(),
        (true, true, Some(expiry)) => format!("valid until {}", expiry),
        (true, _, _) => "expired".to_string(),
    };
    let _ = writeln!(out, "Token:          {}", token);
    let _ = writeln!(
        out,
        "Auth failures:  {}{}",
        status.failure_count,
        if status.breaker_open { " (circuit open)" } else { "" }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        assert_eq!(
            parse_interactive_line("age=52").unwrap(),
            InteractiveCommand::Set {
                field: InputField::Age,
                value: "52".to_string()
            }
        );
        assert_eq!(
            parse_interactive_line(" income = $90,000 ").unwrap(),
            InteractiveCommand::Set {
                field: InputField::AnnualIncome,
                value: "$90,000".to_string()
            }
        );
        assert!(parse_interactive_line("height=180").is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_interactive_line("toggle Dental").unwrap(),
            InteractiveCommand::Toggle(ProductKey::from("dental"))
        );
        assert_eq!(parse_interactive_line("quit").unwrap(), InteractiveCommand::Quit);
        assert_eq!(parse_interactive_line("reset").unwrap(), InteractiveCommand::ResetAuth);
        assert_eq!(parse_interactive_line("   ").unwrap(), InteractiveCommand::Empty);
        assert!(parse_interactive_line("dance").is_err());
    }
}
