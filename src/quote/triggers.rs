//! Which user-input changes require which products to be re-quoted, and how
//! each product's request path is built.

use crate::error::QuoteError;
use crate::quote::types::{InputField, ProductKey, UserInput, products};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A query-string parameter sourced from one input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub field: InputField,
}

impl QueryParam {
    pub fn new(name: impl Into<String>, field: InputField) -> Self {
        Self {
            name: name.into(),
            field,
        }
    }
}

/// Request path of one product: `/<segment>` or `/<segment>/?k=v&...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTemplate {
    pub segment: String,
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

impl PathTemplate {
    pub fn new(segment: impl Into<String>, params: Vec<QueryParam>) -> Self {
        Self {
            segment: segment.into(),
            params,
        }
    }

    pub fn render(&self, input: &UserInput) -> String {
        let segment = self.segment.trim_matches('/');
        if self.params.is_empty() {
            return format!("/{}", segment);
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for param in &self.params {
            query.append_pair(&param.name, &param.field.query_value(input));
        }
        format!("/{}/?{}", segment, query.finish())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub product: ProductKey,
    pub triggers: BTreeSet<InputField>,
    pub path: PathTemplate,
}

impl TriggerSpec {
    pub fn new(
        product: impl Into<ProductKey>,
        triggers: impl IntoIterator<Item = InputField>,
        path: PathTemplate,
    ) -> Self {
        Self {
            product: product.into(),
            triggers: triggers.into_iter().collect(),
            path,
        }
    }

    pub fn build_path(&self, input: &UserInput) -> String {
        self.path.render(input)
    }

    pub fn is_triggered_by(&self, changed: &BTreeSet<InputField>) -> bool {
        !self.triggers.is_disjoint(changed)
    }
}

/// Ordered, validated set of trigger specs
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMatrix {
    specs: Vec<TriggerSpec>,
}

impl TriggerMatrix {
    /// Build a matrix, rejecting duplicate products and specs without triggers
    pub fn new(specs: Vec<TriggerSpec>) -> Result<Self, QuoteError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.product.as_str().is_empty() {
                return Err(QuoteError::Config("product key must not be empty".to_string()));
            }
            if !seen.insert(spec.product.clone()) {
                return Err(QuoteError::Config(format!(
                    "duplicate trigger spec for product '{}'",
                    spec.product
                )));
            }
            if spec.triggers.is_empty() {
                return Err(QuoteError::Config(format!(
                    "product '{}' has no trigger fields",
                    spec.product
                )));
            }
            if spec.path.segment.trim_matches('/').is_empty() {
                return Err(QuoteError::Config(format!(
                    "product '{}' has an empty path segment",
                    spec.product
                )));
            }
        }
        Ok(Self { specs })
    }

    /// The products offered on the quote page
    pub fn standard() -> Self {
        use InputField::*;

        let specs = vec![
            TriggerSpec::new(
                products::LTD,
                [AnnualIncome],
                PathTemplate::new("ltd", vec![QueryParam::new("salary", AnnualIncome)]),
            ),
            TriggerSpec::new(
                products::STD,
                [AnnualIncome, Age],
                PathTemplate::new(
                    "std",
                    vec![
                        QueryParam::new("salary", AnnualIncome),
                        QueryParam::new("age", Age),
                    ],
                ),
            ),
            TriggerSpec::new(
                products::LIFE,
                [Age, EmployeeCoverage, SpouseCoverage],
                PathTemplate::new(
                    "life",
                    vec![
                        QueryParam::new("age", Age),
                        QueryParam::new("employeeCoverage", EmployeeCoverage),
                        QueryParam::new("spouseCoverage", SpouseCoverage),
                    ],
                ),
            ),
            TriggerSpec::new(
                products::ACCIDENT,
                InputField::ALL,
                PathTemplate::new("accident", Vec::new()),
            ),
            TriggerSpec::new(
                products::DENTAL,
                [ZipCode],
                PathTemplate::new("dental", vec![QueryParam::new("zipCode", ZipCode)]),
            ),
            TriggerSpec::new(
                products::VISION,
                [ZipCode],
                PathTemplate::new("vision", vec![QueryParam::new("zipCode", ZipCode)]),
            ),
            TriggerSpec::new(
                products::CRITICAL,
                [Age],
                PathTemplate::new("critical", vec![QueryParam::new("age", Age)]),
            ),
            TriggerSpec::new(
                products::HOSPITAL,
                [Age],
                PathTemplate::new("hospital", vec![QueryParam::new("age", Age)]),
            ),
            TriggerSpec::new(
                products::TELE,
                [ZipCode],
                PathTemplate::new("tele", vec![QueryParam::new("zipCode", ZipCode)]),
            ),
            TriggerSpec::new(
                products::IDENTITY,
                [Age],
                PathTemplate::new("identity", vec![QueryParam::new("age", Age)]),
            ),
        ];

        Self { specs }
    }

    /// Replace specs with matching products and append new ones
    pub fn with_overrides(self, overrides: Vec<TriggerSpec>) -> Result<Self, QuoteError> {
        let mut specs = self.specs;
        for spec in overrides {
            match specs.iter_mut().find(|s| s.product == spec.product) {
                Some(existing) => *existing = spec,
                None => specs.push(spec),
            }
        }
        Self::new(specs)
    }

    pub fn get(&self, product: &ProductKey) -> Option<&TriggerSpec> {
        self.specs.iter().find(|spec| &spec.product == product)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerSpec> {
        self.specs.iter()
    }

    pub fn products(&self) -> impl Iterator<Item = &ProductKey> {
        self.specs.iter().map(|spec| &spec.product)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Products with at least one trigger among `changed`
    pub fn affected_by(&self, changed: &BTreeSet<InputField>) -> BTreeSet<ProductKey> {
        self.specs
            .iter()
            .filter(|spec| spec.is_triggered_by(changed))
            .map(|spec| spec.product.clone())
            .collect()
    }

    pub fn build_path(&self, product: &ProductKey, input: &UserInput) -> Option<String> {
        self.get(product).map(|spec| spec.build_path(input))
    }
}

impl Default for TriggerMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

/// Full quote URL: base + product path + `a=<app tag>`
pub fn quote_url(base_url: &str, path: &str, app_tag: &str) -> String {
    let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str("a=");
    url.push_str(app_tag);
    url
}
