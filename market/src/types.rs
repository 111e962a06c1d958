use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raw oracle answer, in the feed's own fixed-point units.
pub type Price = i128;

/// A directional market move. This is what a randomness request resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bull,
    Bear,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Bull => "Bull",
            Direction::Bear => "Bear",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bull" => Ok(Direction::Bull),
            "Bear" => Ok(Direction::Bear),
            other => Err(anyhow::anyhow!("Invalid Direction value: {}", other)),
        }
    }
}

/// Trend as of the last applied variant change.
///
/// `Neutral` only exists before the first directional move has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    #[default]
    Neutral,
    Bull,
    Bear,
}

impl Trend {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Trend::Neutral => None,
            Trend::Bull => Some(Direction::Bull),
            Trend::Bear => Some(Direction::Bear),
        }
    }
}

impl From<Direction> for Trend {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Bull => Trend::Bull,
            Direction::Bear => Trend::Bear,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Neutral => f.write_str("Neutral"),
            Trend::Bull => f.write_str("Bull"),
            Trend::Bear => f.write_str("Bear"),
        }
    }
}

/// Outcome of comparing two price snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSignal {
    Bull,
    Bear,
    Unchanged,
}

impl TrendSignal {
    pub fn direction(self) -> Option<Direction> {
        match self {
            TrendSignal::Bull => Some(Direction::Bull),
            TrendSignal::Bear => Some(Direction::Bear),
            TrendSignal::Unchanged => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_strings() {
        for d in [Direction::Bull, Direction::Bear] {
            assert_eq!(d.to_string().parse::<Direction>().unwrap(), d);
        }
        assert!("Neutral".parse::<Direction>().is_err());
    }

    #[test]
    fn neutral_has_no_direction() {
        assert_eq!(Trend::default(), Trend::Neutral);
        assert_eq!(Trend::Neutral.direction(), None);
        assert_eq!(Trend::from(Direction::Bear).direction(), Some(Direction::Bear));
    }
}
