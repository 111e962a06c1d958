//! Background loops that drive the engine: the upkeep caller and the
//! randomness delivery path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::Instrument;

use common::logger::{TraceId, root_span};
use common::time::now_ms;
use registry::store::ItemStore;
use variant::types::Fulfillment;

use super::engine::UpkeepEngine;
use super::types::UpkeepOutcome;

/// Calls `perform_upkeep` on a fixed cadence. Each tick gets its own trace id.
///
/// The gate decides whether anything happens; the cadence only bounds latency.
pub fn spawn_upkeep_loop<S>(engine: Arc<UpkeepEngine<S>>, tick: Duration) -> JoinHandle<()>
where
    S: ItemStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);

        loop {
            ticker.tick().await;

            let span = root_span("upkeep_tick", &TraceId::new());
            let result = engine.perform_upkeep(now_ms()).instrument(span).await;

            match result {
                Ok(UpkeepOutcome::Skipped) => {}
                Ok(outcome) => tracing::debug!(?outcome, "upkeep tick"),
                Err(e) => tracing::error!(error = %e, "upkeep tick failed"),
            }
        }
    })
}

/// Forwards provider deliveries into `on_randomness_fulfilled` until the channel closes.
pub fn spawn_fulfillment_loop<S>(
    engine: Arc<UpkeepEngine<S>>,
    mut deliveries: Receiver<Fulfillment>,
) -> JoinHandle<()>
where
    S: ItemStore + 'static,
{
    tokio::spawn(async move {
        while let Some(delivery) = deliveries.recv().await {
            let span = root_span("fulfillment", &TraceId::new());
            span.record("request_id", &tracing::field::display(delivery.request_id));

            let result = engine
                .on_randomness_fulfilled(delivery.request_id, delivery.random_value)
                .instrument(span)
                .await;

            match result {
                Ok(applied) => tracing::debug!(variant = %applied.variant, "delivery applied"),
                Err(e) if e.is_rejected_fulfillment() => {
                    tracing::debug!(error = %e, "delivery ignored")
                }
                Err(e) => tracing::error!(error = %e, "delivery failed"),
            }
        }

        tracing::info!("randomness delivery channel closed");
    })
}
