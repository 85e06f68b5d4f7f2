//! Quote fetching for the insurance products on the page.
//!
//! - [`types`]: user input, product keys and the canonical [`Quote`]
//! - [`triggers`]: which input fields re-quote which products, and their paths
//! - [`normalizer`]: response shape probing and conversion to [`Quote`]
//! - [`debounce`]: cancelable trailing-edge timer
//! - [`orchestrator`]: diff, debounce, batch and apply
//! - [`summary`]: selection totals and hours of work
//! - [`url_params`]: initial input from a page URL

pub mod debounce;
pub mod normalizer;
pub mod orchestrator;
pub mod summary;
pub mod triggers;
pub mod types;
pub mod url_params;


pub use debounce::{DebounceHandle, Debouncer};
pub use normalizer::{QuoteShape, normalize, normalize_with_basis, probe};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorPhase, PARTIAL_FAILURE_MESSAGE, QuoteOrchestrator, QuoteView,
    UpdateOutcome,
};
pub use summary::{PlanSelection, QuoteSummary, SummaryLine, hours_of_work, summarize};
pub use triggers::{PathTemplate, QueryParam, TriggerMatrix, TriggerSpec, quote_url};
pub use types::{
    InputError, InputField, PriceBasis, ProductKey, Quote, UserInput, parse_money, products,
};
pub use url_params::UrlParams;
