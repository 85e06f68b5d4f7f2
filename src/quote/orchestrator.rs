//! Quote-fetch orchestration.
//!
//! The orchestrator owns the quote state of the page. It waits for auth,
//! performs one full fetch, then turns every input change into a diff, the
//! diff into a set of affected products, and debounces those into batches of
//! concurrent requests. Results are normalized and applied per product.
//!
//! ## Phases
//!
//! ```text
//! Uninitialized --activate--> AuthPending --token--> Ready
//!                                  |  ^
//!                                  +--+ retry after auth_retry_delay
//! ```
//!
//! `auth_broken` is orthogonal: it is raised whenever the auth breaker opens
//! and suppresses all fetching until [`QuoteOrchestrator::reset_auth`].
//!
//! ## Batches
//!
//! Every batch takes a sequence number. A product's quote is only replaced by
//! a batch newer than the one that last wrote it, so a slow superseded batch
//! can never overwrite fresher data.

use crate::auth::{AuthGateway, AuthenticatedRequester};
use crate::env;
use crate::error::QuoteError;
use crate::quote::debounce::Debouncer;
use crate::quote::normalizer::normalize_with_basis;
use crate::quote::triggers::{TriggerMatrix, quote_url};
use crate::quote::types::{InputField, PriceBasis, ProductKey, Quote, UserInput, products};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Message shown when at least one product of a batch failed
pub const PARTIAL_FAILURE_MESSAGE: &str = "Some quotes failed to load. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorPhase {
    Uninitialized,
    AuthPending,
    Ready,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub quote_base_url: String,
    pub app_tag: String,
    pub debounce_window: Duration,
    pub auth_retry_delay: Duration,
    pub price_basis: PriceBasis,
    /// Products never re-quoted once they hold a quote
    pub fetch_once: BTreeSet<ProductKey>,
    /// Products skipped while annual income is zero
    pub requires_income: BTreeSet<ProductKey>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            quote_base_url: env::endpoints::PROD_QUOTE_URL.to_string(),
            app_tag: env::quote::APP_TAG.to_string(),
            debounce_window: Duration::from_millis(env::quote::DEBOUNCE_DELAY_MS),
            auth_retry_delay: Duration::from_millis(env::quote::AUTH_RETRY_DELAY_MS),
            price_basis: PriceBasis::Weekly,
            fetch_once: [ProductKey::from(products::ACCIDENT)].into(),
            requires_income: [ProductKey::from(products::STD)].into(),
        }
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteView {
    pub quotes: BTreeMap<ProductKey, Option<Quote>>,
    pub loading: bool,
    pub error: Option<String>,
    pub auth_broken: bool,
    pub phase: OrchestratorPhase,
    pub input_error: Option<String>,
    /// Per-product failure reasons from the most recent batches
    pub failed_products: BTreeMap<ProductKey, String>,
    /// Products waiting for the debounce timer
    pub queued: BTreeSet<ProductKey>,
}

impl QuoteView {
    pub fn quote(&self, product: &str) -> Option<&Quote> {
        self.quotes
            .get(&ProductKey::from(product))
            .and_then(Option::as_ref)
    }

    /// No batch running and nothing waiting to run
    pub fn is_settled(&self) -> bool {
        !self.loading && self.queued.is_empty()
    }
}

/// What a single input update did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub changed: BTreeSet<InputField>,
    pub scheduled: BTreeSet<ProductKey>,
    /// Triggered products skipped by policy, with the reason
    pub excluded: BTreeMap<ProductKey, &'static str>,
}

#[derive(Debug, Default)]
struct QuoteSlot {
    quote: Option<Quote>,
    applied_seq: u64,
}

#[derive(Debug)]
struct OrchestratorState {
    phase: OrchestratorPhase,
    auth_broken: bool,
    /// Input the last scheduling decision was based on
    previous: Option<UserInput>,
    /// Activation reached `Ready` without its full fetch
    initial_fetch_outstanding: bool,
    current: UserInput,
    pending: BTreeSet<ProductKey>,
    slots: BTreeMap<ProductKey, QuoteSlot>,
    in_flight: usize,
    last_seq: u64,
    error: Option<String>,
    input_error: Option<String>,
    failed: BTreeMap<ProductKey, String>,
}

struct Inner {
    config: OrchestratorConfig,
    matrix: TriggerMatrix,
    requester: AuthenticatedRequester,
    state: Mutex<OrchestratorState>,
    debouncer: Debouncer,
    view_tx: watch::Sender<QuoteView>,
}

/// Cheaply cloneable handle; clones share state
#[derive(Clone)]
pub struct QuoteOrchestrator {
    inner: Arc<Inner>,
}

impl QuoteOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        matrix: TriggerMatrix,
        requester: AuthenticatedRequester,
        initial_input: UserInput,
    ) -> Self {
        let slots = matrix
            .products()
            .map(|product| (product.clone(), QuoteSlot::default()))
            .collect();

        let state = OrchestratorState {
            phase: OrchestratorPhase::Uninitialized,
            auth_broken: false,
            previous: None,
            initial_fetch_outstanding: false,
            current: initial_input,
            pending: BTreeSet::new(),
            slots,
            in_flight: 0,
            last_seq: 0,
            error: None,
            input_error: None,
            failed: BTreeMap::new(),
        };

        let (view_tx, _) = watch::channel(build_view(&state));
        let debouncer = Debouncer::new(config.debounce_window);

        Self {
            inner: Arc::new(Inner {
                config,
                matrix,
                requester,
                state: Mutex::new(state),
                debouncer,
                view_tx,
            }),
        }
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        self.inner.requester.gateway()
    }

    pub fn matrix(&self) -> &TriggerMatrix {
        &self.inner.matrix
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Acquire a token, then fetch every product once.
    ///
    /// Returns the phase reached: `Ready` on success, otherwise the phase the
    /// orchestrator stopped in because the auth breaker opened.
    pub async fn activate(&self) -> OrchestratorPhase {
        self.inner.activate().await
    }

    /// Feed a new input snapshot and schedule any re-quotes it requires
    pub async fn update_input(&self, input: UserInput) -> UpdateOutcome {
        self.inner.update_input(input).await
    }

    /// User acknowledged the auth error: close the breaker and resume.
    ///
    /// If activation never completed, the phase returns to `Uninitialized`
    /// so that [`QuoteOrchestrator::activate`] can be called again.
    pub async fn reset_auth(&self) {
        self.inner.requester.gateway().reset().await;

        let mut state = self.inner.state.lock().await;
        state.auth_broken = false;
        state.error = None;
        if state.phase != OrchestratorPhase::Ready {
            state.phase = OrchestratorPhase::Uninitialized;
        }
        info!("Auth error acknowledged, quote fetching resumed");
        self.inner.publish(&state);
    }

    pub fn snapshot(&self) -> QuoteView {
        self.inner.view_tx.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<QuoteView> {
        self.inner.view_tx.subscribe()
    }

    /// Wait until no batch is running or queued
    pub async fn settled(&self) -> QuoteView {
        let mut rx = self.subscribe();
        match rx.wait_for(QuoteView::is_settled).await {
            Ok(view) => view.clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub async fn current_input(&self) -> UserInput {
        self.inner.state.lock().await.current.clone()
    }
}

impl Inner {
    fn publish(&self, state: &OrchestratorState) {
        self.view_tx.send_replace(build_view(state));
    }

    async fn activate(self: &Arc<Self>) -> OrchestratorPhase {
        {
            let mut state = self.state.lock().await;
            if state.phase == OrchestratorPhase::Ready {
                return OrchestratorPhase::Ready;
            }
            state.phase = OrchestratorPhase::AuthPending;
            self.publish(&state);
        }

        let gateway = self.requester.gateway();
        loop {
            if gateway.is_circuit_open().await {
                self.mark_auth_broken().await;
                return OrchestratorPhase::AuthPending;
            }

            let error = match gateway.ensure_valid_token().await {
                Ok(_) => break,
                Err(e) => e,
            };
            if error.is_circuit_open() || gateway.is_circuit_open().await {
                self.mark_auth_broken().await;
                return OrchestratorPhase::AuthPending;
            }
            warn!(
                "Failed to authenticate ({}). Retrying in {:?}",
                error, self.config.auth_retry_delay
            );
            tokio::time::sleep(self.config.auth_retry_delay).await;
        }

        let batch = {
            let mut state = self.state.lock().await;
            state.phase = OrchestratorPhase::Ready;
            let input = state.current.clone();

            if let Err(e) = input.validate() {
                warn!("Initial input is invalid, deferring initial fetch: {}", e);
                state.input_error = Some(e.to_string());
                state.previous = Some(input);
                state.initial_fetch_outstanding = true;
                self.publish(&state);
                return OrchestratorPhase::Ready;
            }

            state.previous = Some(input.clone());
            let products: BTreeSet<ProductKey> = self
                .matrix
                .products()
                .filter(|product| self.exclusion(&state, product, &input).is_none())
                .cloned()
                .collect();
            let seq = self.begin_batch(&mut state);
            self.publish(&state);
            (seq, products, input)
        };

        let (seq, products, input) = batch;
        info!("Auth ready, fetching {} products", products.len());
        self.execute_batch(seq, products, input).await;
        OrchestratorPhase::Ready
    }

    async fn update_input(self: &Arc<Self>, input: UserInput) -> UpdateOutcome {
        let mut state = self.state.lock().await;
        state.current = input.clone();

        if state.phase != OrchestratorPhase::Ready || state.auth_broken {
            debug!(
                "Input recorded without scheduling (phase {:?}, auth broken: {})",
                state.phase, state.auth_broken
            );
            self.publish(&state);
            return UpdateOutcome::default();
        }

        let previous = state.previous.clone().unwrap_or_else(|| input.clone());
        let changed = input.changed_fields(&previous);

        // Advance at scheduling time so the next change diffs against this one
        state.previous = Some(input.clone());

        if let Err(e) = input.validate() {
            debug!("Input rejected, not scheduling: {}", e);
            state.input_error = Some(e.to_string());
            self.publish(&state);
            return UpdateOutcome {
                changed,
                ..Default::default()
            };
        }
        state.input_error = None;

        let mut outcome = UpdateOutcome {
            changed,
            ..Default::default()
        };
        let affected: BTreeSet<ProductKey> = if state.initial_fetch_outstanding {
            debug!("First valid input after activation, fetching every product");
            state.initial_fetch_outstanding = false;
            self.matrix.products().cloned().collect()
        } else {
            self.matrix.affected_by(&outcome.changed)
        };
        for product in affected {
            match self.exclusion(&state, &product, &input) {
                Some(reason) => {
                    outcome.excluded.insert(product, reason);
                }
                None => {
                    outcome.scheduled.insert(product);
                }
            }
        }

        if !outcome.scheduled.is_empty() {
            debug!(
                "Changed {:?} -> scheduling {:?}",
                outcome.changed, outcome.scheduled
            );
            state.pending.extend(outcome.scheduled.iter().cloned());
            let inner = Arc::clone(self);
            self.debouncer.schedule(async move {
                inner.run_pending().await;
            });
        }

        self.publish(&state);
        outcome
    }

    fn exclusion(
        &self,
        state: &OrchestratorState,
        product: &ProductKey,
        input: &UserInput,
    ) -> Option<&'static str> {
        if self.config.fetch_once.contains(product)
            && state
                .slots
                .get(product)
                .is_some_and(|slot| slot.quote.is_some())
        {
            return Some("already quoted");
        }
        if self.config.requires_income.contains(product) && input.annual_income <= 0.0 {
            return Some("no annual income");
        }
        None
    }

    fn begin_batch(&self, state: &mut OrchestratorState) -> u64 {
        state.last_seq += 1;
        state.in_flight += 1;
        state.error = None;
        state.last_seq
    }

    /// Debounce timer fired: fetch everything queued since the last batch
    async fn run_pending(self: Arc<Self>) {
        let batch = {
            let mut state = self.state.lock().await;
            let queued = std::mem::take(&mut state.pending);

            if state.auth_broken || state.phase != OrchestratorPhase::Ready {
                self.publish(&state);
                return;
            }

            // Policies are re-checked against the input the batch will use
            let input = state.current.clone();
            let products: BTreeSet<ProductKey> = queued
                .into_iter()
                .filter(|product| self.exclusion(&state, product, &input).is_none())
                .collect();

            if products.is_empty() {
                self.publish(&state);
                return;
            }

            let seq = self.begin_batch(&mut state);
            self.publish(&state);
            (seq, products, input)
        };

        let (seq, products, input) = batch;
        self.execute_batch(seq, products, input).await;
    }

    async fn execute_batch(&self, seq: u64, products: BTreeSet<ProductKey>, input: UserInput) {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, seq, "Fetching quotes for {:?}", products);

        let fetches = products
            .iter()
            .map(|product| self.fetch_product(product.clone(), &input));
        let results = join_all(fetches).await;

        let breaker_open = self.requester.gateway().is_circuit_open().await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.in_flight = state.in_flight.saturating_sub(1);

        let mut failures = 0usize;
        for (product, result) in results {
            let Some(slot) = state.slots.get_mut(&product) else {
                continue;
            };
            if seq < slot.applied_seq {
                debug!(
                    "Discarding stale {} result from batch {} (applied {})",
                    product, seq, slot.applied_seq
                );
                continue;
            }

            match result {
                Ok(quote) => {
                    slot.quote = Some(quote);
                    slot.applied_seq = seq;
                    state.failed.remove(&product);
                }
                Err(e) => {
                    failures += 1;
                    if e.is_circuit_open() {
                        state.auth_broken = true;
                    }
                    state.failed.insert(product, e.to_string());
                }
            }
        }

        if breaker_open && !state.auth_broken {
            error!("Auth circuit opened during batch {}", seq);
            state.auth_broken = true;
        }
        if state.auth_broken {
            state.pending.clear();
            self.debouncer.cancel();
        }
        if failures > 0 {
            state.error = Some(PARTIAL_FAILURE_MESSAGE.to_string());
        }

        info!(
            %batch_id,
            seq,
            "Quote batch finished: {} ok, {} failed",
            products.len() - failures,
            failures
        );
        self.publish(state);
    }

    async fn fetch_product(
        &self,
        product: ProductKey,
        input: &UserInput,
    ) -> (ProductKey, Result<Quote, QuoteError>) {
        let Some(path) = self.matrix.build_path(&product, input) else {
            let error = QuoteError::Config(format!("no trigger spec for product '{}'", product));
            return (product, Err(error));
        };
        let url = quote_url(&self.config.quote_base_url, &path, &self.config.app_tag);
        debug!("Fetching {} from {}", product, url);

        let result = match self.requester.request_json(&url).await {
            Ok(body) => normalize_with_basis(&body, self.config.price_basis).ok_or_else(|| {
                warn!("Unrecognized quote response for {}: {}", product, body);
                QuoteError::NormalizationFailure {
                    product: product.to_string(),
                }
            }),
            Err(e) => {
                if e.is_circuit_open() {
                    self.mark_auth_broken().await;
                } else {
                    warn!("Error fetching {}: {}", product, e);
                }
                Err(e)
            }
        };

        (product, result)
    }

    async fn mark_auth_broken(&self) {
        let mut state = self.state.lock().await;
        if state.auth_broken {
            return;
        }
        error!("Auth circuit open; quote fetching suspended until reset");
        state.auth_broken = true;
        state.pending.clear();
        self.debouncer.cancel();
        self.publish(&state);
    }
}

fn build_view(state: &OrchestratorState) -> QuoteView {
    QuoteView {
        quotes: state
            .slots
            .iter()
            .map(|(product, slot)| (product.clone(), slot.quote.clone()))
            .collect(),
        loading: state.in_flight > 0,
        error: state.error.clone(),
        auth_broken: state.auth_broken,
        phase: state.phase,
        input_error: state.input_error.clone(),
        failed_products: state.failed.clone(),
        queued: state.pending.clone(),
    }
}
