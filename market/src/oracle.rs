//! Price oracle reader.
//!
//! The engine only ever asks "what does the feed report right now". Feeds
//! give no staleness guarantee and may move between any two calls.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::types::Price;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("price feed unavailable: {0}")]
    Unavailable(String),

    #[error("price feed has no answers")]
    NoData,
}

/// Read-only view of an external price feed.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn latest_price(&self) -> Result<Price, OracleError>;
}

/// Feed whose answer is pushed by hand, like a mock aggregator's `updateAnswer`.
pub struct ManualPriceFeed {
    price: Mutex<Price>,
}

impl ManualPriceFeed {
    pub fn new(initial: Price) -> Self {
        Self {
            price: Mutex::new(initial),
        }
    }

    pub async fn set_price(&self, price: Price) {
        *self.price.lock().await = price;
    }
}

#[async_trait]
impl PriceOracle for ManualPriceFeed {
    async fn latest_price(&self) -> Result<Price, OracleError> {
        Ok(*self.price.lock().await)
    }
}

/// Feed that replays a fixed list of answers, one per read, wrapping around.
pub struct ScriptedPriceFeed {
    script: Vec<Price>,
    cursor: Mutex<usize>,
}

impl ScriptedPriceFeed {
    pub fn new(script: Vec<Price>) -> Result<Self, OracleError> {
        if script.is_empty() {
            return Err(OracleError::NoData);
        }

        Ok(Self {
            script,
            cursor: Mutex::new(0),
        })
    }

    /// Parses a comma separated list such as `"3000,3010,2990"`.
    pub fn parse(raw: &str) -> Result<Self, OracleError> {
        let script = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.replace('_', "")
                    .parse::<Price>()
                    .map_err(|e| OracleError::Unavailable(format!("bad price '{}': {}", s, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(script)
    }
}

#[async_trait]
impl PriceOracle for ScriptedPriceFeed {
    async fn latest_price(&self) -> Result<Price, OracleError> {
        let mut cursor = self.cursor.lock().await;
        let price = self.script[*cursor % self.script.len()];
        *cursor = (*cursor + 1) % self.script.len();

        tracing::trace!(price = %price, "scripted feed answered");
        Ok(price)
    }
}
