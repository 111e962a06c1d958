//! Shared types used by the upkeep subsystem.

use thiserror::Error;
use tokio::sync::mpsc::Sender;

use market::oracle::OracleError;
use market::types::{Direction, Trend, TrendSignal};
use variant::types::{RequestId, RequestRecord, VariantError, VariantRef};

/// Configuration for the upkeep gate.
#[derive(Debug, Clone, Copy)]
pub struct UpkeepConfig {
    /// Minimum spacing between accepted evaluations. Fixed for the engine's lifetime.
    pub interval_ms: u64,
}

impl UpkeepConfig {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            interval_ms: common::time::secs_to_ms(secs),
        }
    }
}

/// A variant that was written to every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedVariant {
    pub variant: VariantRef,
    pub items: usize,
}

impl AppliedVariant {
    pub fn trend(&self) -> Trend {
        self.variant.direction.into()
    }
}

/// What one call to the guarded evaluation entry point did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpkeepOutcome {
    /// Gate closed. Nothing changed.
    Skipped,
    /// Price and time advanced; the applied trend did not flip.
    Unchanged { signal: TrendSignal },
    /// Flip applied synchronously (deterministic strategy).
    Applied(AppliedVariant),
    /// Flip detected; randomness requested, variant decided on fulfillment.
    RequestIssued(RequestRecord),
    /// Flip in the direction already awaiting fulfillment. Price and time advanced.
    AwaitingFulfillment(RequestRecord),
    /// Opposite flip while a request is pending. Rejected; the pending request stays.
    FlipRejectedWhilePending {
        direction: Direction,
        pending: RequestRecord,
    },
}

impl UpkeepOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, UpkeepOutcome::Skipped)
    }
}

/// Notifications for subscribers (indexers, metadata refreshers, CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpkeepEvent {
    TokensUpdated { trend: Trend, variant: VariantRef, items: usize },
    RandomnessRequested(RequestRecord),
    FlipRejectedWhilePending { direction: Direction, pending: RequestRecord },
    FulfillmentRejected { request_id: RequestId, reason: String },
}

pub type EventSender = Sender<UpkeepEvent>;

#[derive(Debug, Error)]
pub enum UpkeepError {
    #[error("no randomness request is pending (got {got})")]
    NoPendingRequest { got: RequestId },

    #[error("fulfillment {got} does not match pending request {expected}")]
    MismatchedFulfillment { expected: RequestId, got: RequestId },

    #[error("price oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("variant selection error: {0}")]
    Variant(#[from] VariantError),

    #[error("registry error: {0:#}")]
    Registry(anyhow::Error),

    #[error("variant selector and item registry use different catalogs")]
    CatalogMismatch,
}

impl UpkeepError {
    /// Stale or unknown fulfillments: rejected, state untouched, nothing to retry.
    pub fn is_rejected_fulfillment(&self) -> bool {
        matches!(
            self,
            UpkeepError::NoPendingRequest { .. } | UpkeepError::MismatchedFulfillment { .. }
        )
    }
}
