//! Conversion of the quoting API's response variants into a canonical
//! [`Quote`].
//!
//! [`probe`] classifies a raw body into a [`QuoteShape`]; [`normalize`] has one
//! branch per shape. Shapes are checked in priority order and the first match
//! wins, even when its branch then yields nothing.

use crate::quote::types::{PriceBasis, Quote, format_weekly, round_cents};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static PRICE_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap());

/// Recognized response layouts, in priority order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuoteShape<'a> {
    /// `{"premium": {"individual": n}}`
    PremiumIndividual(f64),
    /// `{"basic": {"individual": n}}`
    BasicIndividual(f64),
    /// `{"plans": {"premium": {...}}}`
    PlansPremium(&'a Value),
    /// `{"plans": {"basic": {...}}}`
    PlansBasic(&'a Value),
    /// Already carries `price` and/or `weeklyPrice`
    Priced {
        price: Option<&'a Value>,
        weekly_price: Option<&'a Value>,
    },
    /// A bare JSON number
    Bare(f64),
    Unrecognized,
}

pub fn probe(raw: &Value) -> QuoteShape<'_> {
    if let Some(amount) = raw.pointer("/premium/individual").and_then(Value::as_f64) {
        return QuoteShape::PremiumIndividual(amount);
    }
    if let Some(amount) = raw.pointer("/basic/individual").and_then(Value::as_f64) {
        return QuoteShape::BasicIndividual(amount);
    }
    if let Some(plan) = raw.pointer("/plans/premium").filter(|v| !v.is_null()) {
        return QuoteShape::PlansPremium(plan);
    }
    if let Some(plan) = raw.pointer("/plans/basic").filter(|v| !v.is_null()) {
        return QuoteShape::PlansBasic(plan);
    }

    let price = raw.get("price").filter(|v| !v.is_null());
    let weekly_price = raw.get("weeklyPrice").filter(|v| !v.is_null());
    if price.is_some() || weekly_price.is_some() {
        return QuoteShape::Priced {
            price,
            weekly_price,
        };
    }

    match raw.as_f64() {
        Some(amount) => QuoteShape::Bare(amount),
        None => QuoteShape::Unrecognized,
    }
}

/// Normalize a body whose amounts are already weekly
pub fn normalize(raw: &Value) -> Option<Quote> {
    normalize_with_basis(raw, PriceBasis::Weekly)
}

/// Normalize a body, converting amounts quoted in `basis` to weekly.
///
/// This is the only place a monthly→weekly conversion happens.
pub fn normalize_with_basis(raw: &Value, basis: PriceBasis) -> Option<Quote> {
    match probe(raw) {
        QuoteShape::PremiumIndividual(amount)
        | QuoteShape::BasicIndividual(amount)
        | QuoteShape::Bare(amount) => Quote::weekly(basis.to_weekly(amount)),
        QuoteShape::PlansPremium(plan) | QuoteShape::PlansBasic(plan) => {
            normalize_plan(plan, basis)
        }
        QuoteShape::Priced {
            price,
            weekly_price,
        } => from_priced(price, weekly_price, basis),
        QuoteShape::Unrecognized => None,
    }
}

/// A plan sub-object: its `individual` entry first, then the plan itself
fn normalize_plan(plan: &Value, basis: PriceBasis) -> Option<Quote> {
    match plan.get("individual").filter(|v| !v.is_null()) {
        Some(individual) => normalize_with_basis(individual, basis),
        None => normalize_with_basis(plan, basis),
    }
}

fn from_priced(
    price: Option<&Value>,
    weekly_price: Option<&Value>,
    basis: PriceBasis,
) -> Option<Quote> {
    // Pre-formatted weekly display text is kept verbatim
    let display_text = match price {
        Some(Value::String(text)) if basis == PriceBasis::Weekly && !text.trim().is_empty() => {
            Some(text.clone())
        }
        _ => None,
    };

    let amount = weekly_price
        .and_then(amount_of)
        .or_else(|| price.and_then(amount_of))?;
    let amount = round_cents(basis.to_weekly(amount));
    if amount < 0.0 {
        return None;
    }

    Some(Quote {
        display_price: display_text.unwrap_or_else(|| format_weekly(amount)),
        weekly_amount: amount,
    })
}

/// Numeric value of a JSON number or a price string such as `"$28.21/week"`
fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => parse_price_text(text),
        _ => None,
    }
}

/// First amount in a price string, thousands separators ignored
pub fn parse_price_text(text: &str) -> Option<f64> {
    let amount = PRICE_AMOUNT_RE.find(text)?.as_str().replace(',', "");
    amount.parse::<f64>().ok().filter(|amount| amount.is_finite())
}
