//! The upkeep engine.
//!
//! For each upkeep call it:
//!   1. Checks the interval gate (closed => benign skip).
//!   2. Compares the stored price with the oracle price.
//!   3. On a flip, asks the variant selector for a variant.
//!   4. Applies it to every item now, or parks a randomness request until
//!      the provider fulfills it.
//!
//! Evaluations and fulfillments are serialized on one lock, held for the
//! whole step including the registry fan-out. Each step builds the next state
//! aside, persists it through the registry, and only then swaps it in, so a
//! step that fails part way commits nothing.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use market::oracle::PriceOracle;
use market::trend::TrendReading;
use market::types::{Price, Trend};
use registry::error::RegistryError;
use registry::manager::ItemRegistry;
use registry::model::ItemId;
use registry::store::ItemStore;
use variant::selector::{Selection, VariantSelector};
use variant::types::{RandomValue, RequestId, RequestRecord, VariantRef};

use super::gate::check_gate;
use super::state::{MarketSnapshot, MarketState, RequestPhase};
use super::types::{
    AppliedVariant, EventSender, UpkeepConfig, UpkeepError, UpkeepEvent, UpkeepOutcome,
};

pub struct UpkeepEngine<S: ItemStore> {
    state: Arc<Mutex<MarketState>>,
    oracle: Arc<dyn PriceOracle>,
    selector: VariantSelector,
    registry: Arc<ItemRegistry<S>>,
    events: Option<EventSender>,
}

impl<S: ItemStore> UpkeepEngine<S> {
    /// Start from an explicit baseline, ignoring any persisted market state.
    pub fn new(
        cfg: UpkeepConfig,
        initial_price: Price,
        now_ms: u64,
        oracle: Arc<dyn PriceOracle>,
        selector: VariantSelector,
        registry: Arc<ItemRegistry<S>>,
    ) -> Result<Self, UpkeepError> {
        let state = MarketState::new(initial_price, now_ms, cfg.interval_ms);
        Self::from_state(state, oracle, selector, registry)
    }

    /// Resume the market state the registry's store kept from a previous run.
    /// With nothing stored, the baseline price is whatever the oracle reports now.
    pub async fn bootstrap(
        cfg: UpkeepConfig,
        now_ms: u64,
        oracle: Arc<dyn PriceOracle>,
        selector: VariantSelector,
        registry: Arc<ItemRegistry<S>>,
    ) -> Result<Self, UpkeepError> {
        let state = match registry.market().await.map_err(UpkeepError::Registry)? {
            Some(record) => {
                info!(
                    stored_price = %record.stored_price,
                    trend = %record.trend,
                    variant_index = record.variant_index,
                    pending = ?record.pending,
                    "market state restored"
                );
                MarketState::restore(record, cfg.interval_ms)
            }
            None => {
                let initial_price = oracle.latest_price().await?;
                info!(initial_price = %initial_price, "fresh market state");
                MarketState::new(initial_price, now_ms, cfg.interval_ms)
            }
        };

        info!(
            interval_ms = cfg.interval_ms,
            randomized = selector.is_randomized(),
            "upkeep engine bootstrapped"
        );

        Self::from_state(state, oracle, selector, registry)
    }

    fn from_state(
        state: MarketState,
        oracle: Arc<dyn PriceOracle>,
        selector: VariantSelector,
        registry: Arc<ItemRegistry<S>>,
    ) -> Result<Self, UpkeepError> {
        // A resolved index must always be one the registry accepts.
        if selector.catalog() != registry.catalog() {
            return Err(UpkeepError::CatalogMismatch);
        }
        if state.current_trend.direction().is_some() {
            selector.catalog().check(state.applied_variant())?;
        }

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            oracle,
            selector,
            registry,
            events: None,
        })
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &Arc<ItemRegistry<S>> {
        &self.registry
    }

    /// Pure gate predicate; never mutates.
    pub async fn check_evaluation(&self, now_ms: u64) -> bool {
        let state = self.state.lock().await;
        check_gate(state.last_evaluation_ms, state.interval_ms, now_ms).is_open()
    }

    /// Guarded entry point for upkeep callers: reads the oracle, then evaluates.
    ///
    /// The oracle is only consulted once the gate is open.
    #[instrument(skip(self), target = "upkeep")]
    pub async fn perform_upkeep(&self, now_ms: u64) -> Result<UpkeepOutcome, UpkeepError> {
        let mut state = self.state.lock().await;

        if !check_gate(state.last_evaluation_ms, state.interval_ms, now_ms).is_open() {
            debug!(last_evaluation_ms = state.last_evaluation_ms, "gate closed");
            return Ok(UpkeepOutcome::Skipped);
        }

        let price = self.oracle.latest_price().await?;
        self.evaluate_locked(&mut state, now_ms, price).await
    }

    /// Guarded evaluation against a price supplied by the caller.
    ///
    /// Gate closed is `Ok(Skipped)`, not an error.
    #[instrument(skip(self), target = "upkeep", fields(price = %price))]
    pub async fn perform_evaluation(
        &self,
        now_ms: u64,
        price: Price,
    ) -> Result<UpkeepOutcome, UpkeepError> {
        let mut state = self.state.lock().await;

        if !check_gate(state.last_evaluation_ms, state.interval_ms, now_ms).is_open() {
            debug!(last_evaluation_ms = state.last_evaluation_ms, "gate closed");
            return Ok(UpkeepOutcome::Skipped);
        }

        self.evaluate_locked(&mut state, now_ms, price).await
    }

    async fn evaluate_locked(
        &self,
        state: &mut MarketState,
        now_ms: u64,
        price: Price,
    ) -> Result<UpkeepOutcome, UpkeepError> {
        let reading = TrendReading::new(state.stored_price, price);

        let mut next = state.clone();
        next.advance(price, now_ms);

        let Some(direction) = reading.flip_from(state.current_trend) else {
            self.persist(&next).await?;
            *state = next;
            debug!(
                signal = ?reading.signal,
                trend = %state.current_trend,
                "no flip; price and time advanced"
            );
            return Ok(UpkeepOutcome::Unchanged {
                signal: reading.signal,
            });
        };

        if let RequestPhase::RequestIssued(pending) = state.phase {
            self.persist(&next).await?;
            *state = next;

            if pending.requested == direction {
                debug!(request_id = %pending.request_id, "flip already awaiting fulfillment");
                return Ok(UpkeepOutcome::AwaitingFulfillment(pending));
            }

            warn!(
                direction = %direction,
                pending = %pending.request_id,
                "flip rejected: randomness request still pending"
            );
            self.emit(UpkeepEvent::FlipRejectedWhilePending { direction, pending });
            return Ok(UpkeepOutcome::FlipRejectedWhilePending { direction, pending });
        }

        match self.selector.select(direction).await? {
            Selection::Immediate(variant) => {
                next.commit_variant(variant);
                let applied = self.apply(variant, &next).await?;
                *state = next;

                info!(
                    trend = %applied.trend(),
                    variant = %variant,
                    items = applied.items,
                    "variant applied"
                );
                self.emit_applied(applied);
                Ok(UpkeepOutcome::Applied(applied))
            }
            Selection::Deferred(record) => {
                next.phase = RequestPhase::RequestIssued(record);
                self.persist(&next).await?;
                *state = next;

                info!(
                    request_id = %record.request_id,
                    direction = %record.requested,
                    "randomness request issued"
                );
                self.emit(UpkeepEvent::RandomnessRequested(record));
                Ok(UpkeepOutcome::RequestIssued(record))
            }
        }
    }

    /// Callback for the randomness provider.
    ///
    /// Only the pending request's id is accepted. Anything else is rejected
    /// without touching state.
    #[instrument(skip(self), target = "upkeep", fields(request_id = %request_id))]
    pub async fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        random_value: RandomValue,
    ) -> Result<AppliedVariant, UpkeepError> {
        let mut state = self.state.lock().await;

        let record = match self.matching_request(&state, request_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "fulfillment rejected");
                self.emit(UpkeepEvent::FulfillmentRejected {
                    request_id,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let variant = self.selector.resolve(&record, random_value);

        let mut next = state.clone();
        next.commit_variant(variant);
        next.phase = RequestPhase::Idle;

        let applied = self.apply(variant, &next).await?;
        *state = next;

        info!(
            trend = %applied.trend(),
            variant = %variant,
            items = applied.items,
            "fulfillment applied"
        );
        self.emit_applied(applied);
        Ok(applied)
    }

    fn matching_request(
        &self,
        state: &MarketState,
        request_id: RequestId,
    ) -> Result<RequestRecord, UpkeepError> {
        match state.phase {
            RequestPhase::Idle => Err(UpkeepError::NoPendingRequest { got: request_id }),
            RequestPhase::RequestIssued(record) if record.request_id != request_id => {
                Err(UpkeepError::MismatchedFulfillment {
                    expected: record.request_id,
                    got: request_id,
                })
            }
            RequestPhase::RequestIssued(record) => Ok(record),
        }
    }

    /// Write `variant` to every item together with the state it leads to.
    async fn apply(
        &self,
        variant: VariantRef,
        next: &MarketState,
    ) -> Result<AppliedVariant, UpkeepError> {
        let items = self
            .registry
            .apply_to_all(variant, &next.record())
            .await
            .map_err(UpkeepError::Registry)?;

        Ok(AppliedVariant { variant, items })
    }

    async fn persist(&self, next: &MarketState) -> Result<(), UpkeepError> {
        self.registry
            .record_market(&next.record())
            .await
            .map_err(UpkeepError::Registry)
    }

    fn emit_applied(&self, applied: AppliedVariant) {
        self.emit(UpkeepEvent::TokensUpdated {
            trend: applied.trend(),
            variant: applied.variant,
            items: applied.items,
        });
    }

    fn emit(&self, event: UpkeepEvent) {
        let Some(tx) = &self.events else { return };

        // Never block while holding the state lock.
        if let Err(e) = tx.try_send(event) {
            warn!(error = %e, "upkeep event dropped");
        }
    }

    /// Issue an item showing the currently applied variant.
    ///
    /// Holds the state lock so issuance cannot interleave with a batch apply.
    pub async fn mint(&self, owner: impl Into<String>, now_ms: u64) -> anyhow::Result<ItemId> {
        let state = self.state.lock().await;
        self.registry
            .issue(owner, state.applied_variant(), now_ms)
            .await
    }

    pub async fn token_uri(&self, id: ItemId) -> Result<String, RegistryError> {
        self.registry.token_uri(id).await
    }

    pub async fn stored_price(&self) -> Price {
        self.state.lock().await.stored_price
    }

    pub async fn last_evaluation_ms(&self) -> u64 {
        self.state.lock().await.last_evaluation_ms
    }

    pub async fn current_trend(&self) -> Trend {
        self.state.lock().await.current_trend
    }

    pub async fn current_variant_index(&self) -> usize {
        self.state.lock().await.current_variant_index
    }

    pub async fn pending_request(&self) -> Option<RequestRecord> {
        self.state.lock().await.pending()
    }

    pub async fn snapshot(&self) -> MarketSnapshot {
        self.state.lock().await.snapshot()
    }
}
