//! Seeding the initial [`UserInput`] from a page URL.

use crate::quote::types::UserInput;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static ZIP_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").unwrap());

const MAX_AGE: f64 = 150.0;
const MAX_ANNUAL_SALARY: f64 = 999_999_999.0;

/// Validated subset of the recognised query parameters.
///
/// Parameters that fail validation are dropped with a warning rather than
/// rejecting the whole URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlParams {
    pub zip_code: Option<String>,
    pub age: Option<u32>,
    pub annual_salary: Option<f64>,
}

impl UrlParams {
    /// Parse a full URL (`https://host/?zipCode=...`) or a bare query string
    /// (`zipCode=...&age=...`, with or without the leading `?`).
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let query = match Url::parse(input) {
            Ok(url) => url.query().unwrap_or_default().to_string(),
            Err(_) => input.trim_start_matches('?').to_string(),
        };

        let mut params = UrlParams::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "zipCode" => params.zip_code = parse_zip_code(value),
                "age" => params.age = parse_age(value),
                "annualSalary" => params.annual_salary = parse_annual_salary(value),
                other => debug!("Ignoring URL parameter '{}'", other),
            }
        }

        debug!("Valid URL parameters: {:?}", params);
        params
    }

    pub fn is_empty(&self) -> bool {
        self.zip_code.is_none() && self.age.is_none() && self.annual_salary.is_none()
    }

    /// `base` with every present parameter applied
    pub fn apply_to(&self, base: &UserInput) -> UserInput {
        let mut input = base.clone();
        if let Some(zip_code) = &self.zip_code {
            input.zip_code = zip_code.clone();
        }
        if let Some(age) = self.age {
            input.age = age;
        }
        if let Some(salary) = self.annual_salary {
            input.annual_income = salary;
        }
        input
    }
}

fn parse_zip_code(value: &str) -> Option<String> {
    if ZIP_CODE_RE.is_match(value) {
        Some(value.to_string())
    } else {
        warn!("Invalid zipCode parameter: '{}'", value);
        None
    }
}

fn parse_age(value: &str) -> Option<u32> {
    match value.parse::<f64>() {
        Ok(age) if (0.0..=MAX_AGE).contains(&age) && age.fract() == 0.0 => Some(age as u32),
        _ => {
            warn!("Invalid age parameter: '{}'", value);
            None
        }
    }
}

fn parse_annual_salary(value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(salary) if (0.0..=MAX_ANNUAL_SALARY).contains(&salary) => Some(salary),
        _ => {
            warn!("Invalid annualSalary parameter: '{}'", value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let params =
            UrlParams::parse("https://quotes.example.com/?zipCode=10001&age=35&annualSalary=85000");
        assert_eq!(params.zip_code.as_deref(), Some("10001"));
        assert_eq!(params.age, Some(35));
        assert_eq!(params.annual_salary, Some(85_000.0));
    }

    #[test]
    fn test_parse_bare_query() {
        let params = UrlParams::parse("?age=60");
        assert_eq!(params.age, Some(60));
        assert!(params.zip_code.is_none());

        let params = UrlParams::parse("zipCode=94105");
        assert_eq!(params.zip_code.as_deref(), Some("94105"));
    }

    #[test]
    fn test_invalid_values_are_dropped_individually() {
        let params = UrlParams::parse("zipCode=1234&age=151&annualSalary=1000000000");
        assert!(params.is_empty());

        let params = UrlParams::parse("zipCode=abcde&age=-1&annualSalary=50000");
        assert_eq!(params.zip_code, None);
        assert_eq!(params.age, None);
        assert_eq!(params.annual_salary, Some(50_000.0));

        assert_eq!(UrlParams::parse("age=30.5").age, None);
        assert_eq!(UrlParams::parse("age=").age, None);
    }

    #[test]
    fn test_apply_to_overrides_present_fields_only() {
        let base = UserInput::default();
        let params = UrlParams::parse("age=30&annualSalary=0");
        let input = params.apply_to(&base);

        assert_eq!(input.age, 30);
        assert_eq!(input.annual_income, 0.0);
        assert_eq!(input.zip_code, base.zip_code);
        assert_eq!(input.employee_coverage, base.employee_coverage);
    }
}
