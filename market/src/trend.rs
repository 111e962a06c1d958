use crate::types::{Direction, Price, Trend, TrendSignal};

/// Trend evaluation
///
/// Compares the price recorded at the previous accepted evaluation with the
/// price the oracle reports now.
///
/// ```text
/// oracle > stored  => Bull
/// oracle < stored  => Bear
/// oracle == stored => Unchanged
/// ```
///
/// Pure and total: no warm-up, no invalid state, no side effects.
pub fn evaluate(stored_price: Price, oracle_price: Price) -> TrendSignal {
    match oracle_price.cmp(&stored_price) {
        std::cmp::Ordering::Greater => TrendSignal::Bull,
        std::cmp::Ordering::Less => TrendSignal::Bear,
        std::cmp::Ordering::Equal => TrendSignal::Unchanged,
    }
}

/// Returns the direction to switch to, if `signal` flips the applied trend.
///
/// `Unchanged` never flips. A move in the already-applied direction never flips.
/// From `Neutral`, any directional move flips.
pub fn flip_direction(applied: Trend, signal: TrendSignal) -> Option<Direction> {
    let next = signal.direction()?;
    if applied.direction() == Some(next) {
        return None;
    }
    Some(next)
}

/// One evaluation: the two prices compared and what came out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrendReading {
    pub stored_price: Price,
    pub oracle_price: Price,
    pub signal: TrendSignal,
}

impl TrendReading {
    pub fn new(stored_price: Price, oracle_price: Price) -> Self {
        Self {
            stored_price,
            oracle_price,
            signal: evaluate(stored_price, oracle_price),
        }
    }

    pub fn flip_from(&self, applied: Trend) -> Option<Direction> {
        flip_direction(applied, self.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Price = 3_000_000_000_000;

    #[test]
    fn rising_price_is_bull() {
        assert_eq!(evaluate(BASE, BASE + 10_000), TrendSignal::Bull);
    }

    #[test]
    fn falling_price_is_bear() {
        assert_eq!(evaluate(BASE, BASE - 1), TrendSignal::Bear);
    }

    #[test]
    fn equal_price_is_unchanged() {
        assert_eq!(evaluate(BASE, BASE), TrendSignal::Unchanged);
    }

    #[test]
    fn negative_prices_compare_numerically() {
        assert_eq!(evaluate(-5, -3), TrendSignal::Bull);
        assert_eq!(evaluate(0, -1), TrendSignal::Bear);
    }

    #[test]
    fn unchanged_never_flips() {
        for t in [Trend::Neutral, Trend::Bull, Trend::Bear] {
            assert_eq!(flip_direction(t, TrendSignal::Unchanged), None);
        }
    }

    #[test]
    fn same_direction_does_not_flip() {
        assert_eq!(flip_direction(Trend::Bull, TrendSignal::Bull), None);
        assert_eq!(flip_direction(Trend::Bear, TrendSignal::Bear), None);
    }

    #[test]
    fn opposite_direction_flips() {
        assert_eq!(flip_direction(Trend::Bull, TrendSignal::Bear), Some(Direction::Bear));
        assert_eq!(flip_direction(Trend::Bear, TrendSignal::Bull), Some(Direction::Bull));
    }

    #[test]
    fn neutral_flips_on_any_move() {
        assert_eq!(flip_direction(Trend::Neutral, TrendSignal::Bull), Some(Direction::Bull));
        assert_eq!(flip_direction(Trend::Neutral, TrendSignal::Bear), Some(Direction::Bear));
    }

    #[test]
    fn reading_carries_both_prices() {
        let r = TrendReading::new(BASE, BASE - 7);
        assert_eq!(r.signal, TrendSignal::Bear);
        assert_eq!(r.flip_from(Trend::Bear), None);
        assert_eq!(r.flip_from(Trend::Bull), Some(Direction::Bear));
    }
}
