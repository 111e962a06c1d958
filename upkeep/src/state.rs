//! Market state owned by the upkeep engine.
//!
//! Single writer: only the gate-guarded evaluation path and the fulfillment
//! path mutate it, both while holding the engine's lock.

use market::types::{Price, Trend};
use registry::model::MarketRecord;
use variant::types::{RequestRecord, VariantRef};

/// Where the randomness round trip stands.
///
/// `Idle -> RequestIssued -> Idle`; only a matching fulfillment leaves `RequestIssued`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    #[default]
    Idle,
    RequestIssued(RequestRecord),
}

#[derive(Debug, Clone)]
pub struct MarketState {
    pub(crate) stored_price: Price,
    pub(crate) last_evaluation_ms: u64,
    pub(crate) interval_ms: u64,
    pub(crate) current_trend: Trend,
    pub(crate) current_variant_index: usize,
    pub(crate) phase: RequestPhase,
}

/// Committed view of `MarketState` handed to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub stored_price: Price,
    pub last_evaluation_ms: u64,
    pub interval_ms: u64,
    pub current_trend: Trend,
    pub current_variant_index: usize,
    pub pending: Option<RequestRecord>,
}

impl MarketState {
    pub fn new(initial_price: Price, now_ms: u64, interval_ms: u64) -> Self {
        Self {
            stored_price: initial_price,
            last_evaluation_ms: now_ms,
            interval_ms,
            current_trend: Trend::Neutral,
            current_variant_index: 0,
            phase: RequestPhase::Idle,
        }
    }

    /// Rebuild the state saved by a previous run. The interval always comes
    /// from the current configuration.
    pub fn restore(record: MarketRecord, interval_ms: u64) -> Self {
        Self {
            stored_price: record.stored_price,
            last_evaluation_ms: record.last_evaluation_ms,
            interval_ms,
            current_trend: record.trend,
            current_variant_index: record.variant_index,
            phase: match record.pending {
                Some(pending) => RequestPhase::RequestIssued(pending),
                None => RequestPhase::Idle,
            },
        }
    }

    pub fn record(&self) -> MarketRecord {
        MarketRecord {
            stored_price: self.stored_price,
            last_evaluation_ms: self.last_evaluation_ms,
            trend: self.current_trend,
            variant_index: self.current_variant_index,
            pending: self.pending(),
        }
    }

    pub fn pending(&self) -> Option<RequestRecord> {
        match self.phase {
            RequestPhase::Idle => None,
            RequestPhase::RequestIssued(record) => Some(record),
        }
    }

    /// The variant items should currently show. Before the first flip that is
    /// the first bull asset.
    pub fn applied_variant(&self) -> VariantRef {
        match self.current_trend.direction() {
            Some(direction) => VariantRef::new(direction, self.current_variant_index),
            None => VariantRef::default(),
        }
    }

    /// Record an accepted evaluation. Time never moves backwards.
    pub(crate) fn advance(&mut self, price: Price, now_ms: u64) {
        self.stored_price = price;
        self.last_evaluation_ms = self.last_evaluation_ms.max(now_ms);
    }

    pub(crate) fn commit_variant(&mut self, variant: VariantRef) {
        self.current_trend = variant.direction.into();
        self.current_variant_index = variant.index;
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            stored_price: self.stored_price,
            last_evaluation_ms: self.last_evaluation_ms,
            interval_ms: self.interval_ms,
            current_trend: self.current_trend,
            current_variant_index: self.current_variant_index,
            pending: self.pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market::types::Direction;
    use variant::types::RequestId;

    #[test]
    fn starts_neutral_idle_on_default_variant() {
        let s = MarketState::new(3_000, 1_000, 60_000);

        assert_eq!(s.current_trend, Trend::Neutral);
        assert_eq!(s.pending(), None);
        assert_eq!(s.applied_variant(), VariantRef::default());
    }

    #[test]
    fn advance_never_moves_time_back() {
        let mut s = MarketState::new(3_000, 10_000, 60_000);

        s.advance(3_100, 5_000);
        assert_eq!(s.stored_price, 3_100);
        assert_eq!(s.last_evaluation_ms, 10_000);

        s.advance(3_200, 80_000);
        assert_eq!(s.last_evaluation_ms, 80_000);
    }

    #[test]
    fn commit_sets_trend_and_index_together() {
        let mut s = MarketState::new(3_000, 0, 60_000);

        s.commit_variant(VariantRef::new(Direction::Bear, 2));

        assert_eq!(s.current_trend, Trend::Bear);
        assert_eq!(s.current_variant_index, 2);
        assert_eq!(s.applied_variant(), VariantRef::new(Direction::Bear, 2));
    }

    #[test]
    fn snapshot_exposes_pending_request() {
        let mut s = MarketState::new(3_000, 0, 60_000);
        let record = RequestRecord {
            request_id: RequestId(9),
            requested: Direction::Bull,
        };
        s.phase = RequestPhase::RequestIssued(record);

        assert_eq!(s.snapshot().pending, Some(record));
        assert_eq!(s.snapshot().current_trend, Trend::Neutral);
    }

    #[test]
    fn record_and_restore_keep_every_durable_field() {
        let mut s = MarketState::new(3_000, 5_000, 60_000);
        s.commit_variant(VariantRef::new(Direction::Bear, 1));
        s.phase = RequestPhase::RequestIssued(RequestRecord {
            request_id: RequestId(4),
            requested: Direction::Bull,
        });

        let back = MarketState::restore(s.record(), 90_000);

        assert_eq!(back.interval_ms, 90_000);
        assert_eq!(back.phase, s.phase);
        assert_eq!(back.applied_variant(), s.applied_variant());
        assert_eq!(back.record(), s.record());
    }
}
