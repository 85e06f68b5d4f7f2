use crate::env;
use crate::quote::types::{ProductKey, Quote, format_weekly, products, round_cents};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Products the user has toggled into their plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSelection {
    enabled: BTreeSet<ProductKey>,
}

impl Default for PlanSelection {
    fn default() -> Self {
        Self::new([
            products::LTD,
            products::STD,
            products::LIFE,
            products::ACCIDENT,
            products::DENTAL,
            products::VISION,
        ])
    }
}

impl PlanSelection {
    pub fn new<I, K>(products: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ProductKey>,
    {
        Self {
            enabled: products.into_iter().map(Into::into).collect(),
        }
    }

    pub fn toggle(&mut self, product: impl Into<ProductKey>, enabled: bool) {
        let product = product.into();
        if enabled {
            self.enabled.insert(product);
        } else {
            self.enabled.remove(&product);
        }
    }

    pub fn is_enabled(&self, product: &ProductKey) -> bool {
        self.enabled.contains(product)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductKey> {
        self.enabled.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub product: ProductKey,
    pub display_price: String,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSummary {
    pub lines: Vec<SummaryLine>,
    pub total_weekly: f64,
    /// Hours of work per week that pay for the plan
    pub hours_of_work: Option<f64>,
}

impl QuoteSummary {
    pub fn total_display(&self) -> String {
        format_weekly(self.total_weekly)
    }
}

/// Totals over the enabled products that hold a quote
pub fn summarize(
    quotes: &BTreeMap<ProductKey, Option<Quote>>,
    selection: &PlanSelection,
    annual_income: f64,
) -> QuoteSummary {
    let lines: Vec<SummaryLine> = selection
        .iter()
        .map(|product| match quotes.get(product).and_then(Option::as_ref) {
            Some(quote) => SummaryLine {
                product: product.clone(),
                display_price: quote.display_price.clone(),
                quoted: true,
            },
            None => SummaryLine {
                product: product.clone(),
                display_price: format_weekly(0.0),
                quoted: false,
            },
        })
        .collect();

    let total_weekly = round_cents(
        selection
            .iter()
            .filter_map(|product| quotes.get(product).and_then(Option::as_ref))
            .map(|quote| quote.weekly_amount)
            .sum(),
    );

    QuoteSummary {
        lines,
        total_weekly,
        hours_of_work: hours_of_work(total_weekly, annual_income),
    }
}

/// Weekly cost expressed in hours at the hourly rate of `annual_income`
pub fn hours_of_work(total_weekly: f64, annual_income: f64) -> Option<f64> {
    if !annual_income.is_finite() || annual_income <= 0.0 {
        return None;
    }
    let hourly_rate = annual_income / env::quote::WORK_HOURS_PER_YEAR;
    Some((total_weekly / hourly_rate * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotes(entries: &[(&str, Option<f64>)]) -> BTreeMap<ProductKey, Option<Quote>> {
        entries
            .iter()
            .map(|(key, amount)| (ProductKey::from(*key), amount.and_then(Quote::weekly)))
            .collect()
    }

    #[test]
    fn test_total_covers_enabled_quoted_products() {
        let quotes = quotes(&[
            ("ltd", Some(28.21)),
            ("std", Some(10.5)),
            ("life", None),
            ("critical", Some(99.0)),
        ]);
        let summary = summarize(&quotes, &PlanSelection::default(), 200_000.0);

        assert_eq!(summary.total_weekly, 38.71);
        assert_eq!(summary.total_display(), "$38.71/week");
        assert_eq!(summary.lines.len(), 6);

        let life = summary
            .lines
            .iter()
            .find(|line| line.product.as_str() == "life")
            .unwrap();
        assert!(!life.quoted);
        assert_eq!(life.display_price, "$0.00/week");
    }

    #[test]
    fn test_toggle_changes_total() {
        let quotes = quotes(&[("ltd", Some(28.21)), ("critical", Some(5.0))]);
        let mut selection = PlanSelection::default();
        selection.toggle("ltd", false);
        selection.toggle("critical", true);

        let summary = summarize(&quotes, &selection, 100_000.0);
        assert_eq!(summary.total_weekly, 5.0);
        assert!(!selection.is_enabled(&ProductKey::from("ltd")));
    }

    #[test]
    fn test_hours_of_work() {
        // 104000 / 2080 = 50 per hour
        assert_eq!(hours_of_work(75.0, 104_000.0), Some(1.5));
        assert_eq!(hours_of_work(38.71, 200_000.0), Some(0.4));
        assert_eq!(hours_of_work(10.0, 0.0), None);
    }
}
