use crate::env;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Product identifiers known to the standard trigger matrix
pub mod products {
    pub const LTD: &str = "ltd";
    pub const STD: &str = "std";
    pub const LIFE: &str = "life";
    pub const ACCIDENT: &str = "accident";
    pub const DENTAL: &str = "dental";
    pub const VISION: &str = "vision";
    pub const CRITICAL: &str = "critical";
    pub const HOSPITAL: &str = "hospital";
    pub const TELE: &str = "tele";
    pub const IDENTITY: &str = "identity";
}

/// Insurance product identifier.
///
/// String-backed so that products added through configuration need no code
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKey(String);

impl ProductKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-editable attribute that can trigger re-quoting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    Age,
    ZipCode,
    #[serde(alias = "annualSalary")]
    AnnualIncome,
    EmployeeCoverage,
    SpouseCoverage,
}

impl InputField {
    pub const ALL: [InputField; 5] = [
        InputField::Age,
        InputField::ZipCode,
        InputField::AnnualIncome,
        InputField::EmployeeCoverage,
        InputField::SpouseCoverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputField::Age => "age",
            InputField::ZipCode => "zipCode",
            InputField::AnnualIncome => "annualIncome",
            InputField::EmployeeCoverage => "employeeCoverage",
            InputField::SpouseCoverage => "spouseCoverage",
        }
    }

    /// Value of this field formatted for a request query string
    pub fn query_value(&self, input: &UserInput) -> String {
        match self {
            InputField::Age => input.age.to_string(),
            InputField::ZipCode => input.zip_code.clone(),
            InputField::AnnualIncome => input.annual_income.to_string(),
            InputField::EmployeeCoverage => input.employee_coverage.to_string(),
            InputField::SpouseCoverage => input.spouse_coverage.to_string(),
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputField {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "age" => Ok(InputField::Age),
            "zip" | "zipcode" => Ok(InputField::ZipCode),
            "income" | "annualincome" | "salary" | "annualsalary" => Ok(InputField::AnnualIncome),
            "employeecoverage" => Ok(InputField::EmployeeCoverage),
            "spousecoverage" => Ok(InputField::SpouseCoverage),
            _ => Err(InputError::UnknownField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Invalid zip code format: '{0}'")]
    InvalidZipCode(String),
    #[error("{field} must be a non-negative number")]
    Negative { field: InputField },
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: InputField, value: String },
    #[error("Unknown input field '{0}'")]
    UnknownField(String),
}

/// Values the quote page collects from the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub age: u32,
    #[serde(default)]
    pub zip_code: String,
    #[serde(alias = "annualSalary", default)]
    pub annual_income: f64,
    #[serde(default)]
    pub employee_coverage: f64,
    #[serde(default)]
    pub spouse_coverage: f64,
}

impl Default for UserInput {
    /// The quote page's initial profile
    fn default() -> Self {
        Self {
            age: 46,
            zip_code: "07073".to_string(),
            annual_income: 200_000.0,
            employee_coverage: 20_000.0,
            spouse_coverage: 10_000.0,
        }
    }
}

impl UserInput {
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.zip_code.is_empty()
            && !(self.zip_code.len() == 5 && self.zip_code.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(InputError::InvalidZipCode(self.zip_code.clone()));
        }

        for (field, value) in [
            (InputField::AnnualIncome, self.annual_income),
            (InputField::EmployeeCoverage, self.employee_coverage),
            (InputField::SpouseCoverage, self.spouse_coverage),
        ] {
            if !value.is_finite() {
                return Err(InputError::InvalidValue {
                    field,
                    value: value.to_string(),
                });
            }
            if value < 0.0 {
                return Err(InputError::Negative { field });
            }
        }

        Ok(())
    }

    /// Pricing region: the leading digits of the zip code
    pub fn zip_region(&self) -> &str {
        self.zip_code
            .get(..env::quote::ZIP_REGION_PREFIX_LEN)
            .unwrap_or(&self.zip_code)
    }

    /// Fields whose value differs from `previous`.
    ///
    /// Zip codes are compared by region so that a change inside the same
    /// region does not count.
    pub fn changed_fields(&self, previous: &UserInput) -> BTreeSet<InputField> {
        InputField::ALL
            .into_iter()
            .filter(|field| match field {
                InputField::Age => self.age != previous.age,
                InputField::ZipCode => self.zip_region() != previous.zip_region(),
                InputField::AnnualIncome => self.annual_income != previous.annual_income,
                InputField::EmployeeCoverage => {
                    self.employee_coverage != previous.employee_coverage
                }
                InputField::SpouseCoverage => self.spouse_coverage != previous.spouse_coverage,
            })
            .collect()
    }

    /// Copy of this input with one field replaced from its text form
    pub fn with_field(&self, field: InputField, raw: &str) -> Result<UserInput, InputError> {
        let raw = raw.trim();
        let invalid = || InputError::InvalidValue {
            field,
            value: raw.to_string(),
        };

        let mut updated = self.clone();
        match field {
            InputField::Age => updated.age = raw.parse().map_err(|_| invalid())?,
            InputField::ZipCode => updated.zip_code = raw.to_string(),
            InputField::AnnualIncome => {
                updated.annual_income = parse_money(raw).ok_or_else(invalid)?
            }
            InputField::EmployeeCoverage => {
                updated.employee_coverage = parse_money(raw).ok_or_else(invalid)?
            }
            InputField::SpouseCoverage => {
                updated.spouse_coverage = parse_money(raw).ok_or_else(invalid)?
            }
        }
        updated.validate()?;
        Ok(updated)
    }
}

/// Parse an amount such as `"$200,000"` or `"1500.50"`
pub fn parse_money(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Canonical per-product price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "price", alias = "displayPrice")]
    pub display_price: String,
    #[serde(rename = "weeklyPrice", alias = "weeklyAmount")]
    pub weekly_amount: f64,
}

impl Quote {
    /// Quote for a weekly amount, rounded to cents; `None` for negative or
    /// non-finite amounts.
    pub fn weekly(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let amount = round_cents(amount);
        Some(Self {
            display_price: format_weekly(amount),
            weekly_amount: amount,
        })
    }
}

pub fn format_weekly(amount: f64) -> String {
    format!("${:.2}/week", amount)
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Period the upstream API quotes prices in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBasis {
    #[default]
    Weekly,
    /// Converted to weekly by dividing by 4
    Monthly,
}

impl PriceBasis {
    pub fn to_weekly(&self, amount: f64) -> f64 {
        match self {
            PriceBasis::Weekly => amount,
            PriceBasis::Monthly => round_cents(amount / 4.0),
        }
    }
}
