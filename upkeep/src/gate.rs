//! Decides whether an upkeep call may re-evaluate the trend now.
//
//  Pure: no async, no IO. The engine re-checks this under its state lock, so
//  callers may invoke the guarded action speculatively or redundantly.

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Open,
    IntervalNotElapsed,
}

impl GateDecision {
    pub fn is_open(&self) -> bool {
        matches!(self, GateDecision::Open)
    }
}

/// Open once strictly more than `interval_ms` has passed since the last
/// accepted evaluation. A clock behind `last_evaluation_ms` keeps it closed.
pub fn check_gate(last_evaluation_ms: u64, interval_ms: u64, now_ms: u64) -> GateDecision {
    let elapsed = now_ms.saturating_sub(last_evaluation_ms);
    if elapsed > interval_ms {
        GateDecision::Open
    } else {
        GateDecision::IntervalNotElapsed
    }
}
