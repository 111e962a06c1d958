//! Common types and the randomness seam used by variant selection.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use market::types::Direction;

/// Identifier issued by the randomness provider. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Random word delivered by a fulfillment.
pub type RandomValue = u64;

/// Reference into the variant catalog: which direction's asset list, and which entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantRef {
    pub direction: Direction,
    pub index: usize,
}

impl VariantRef {
    pub fn new(direction: Direction, index: usize) -> Self {
        Self { direction, index }
    }
}

impl Default for VariantRef {
    /// Items start out on the first bull asset.
    fn default() -> Self {
        Self {
            direction: Direction::Bull,
            index: 0,
        }
    }
}

impl fmt::Display for VariantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.direction, self.index)
    }
}

/// An outstanding randomness request.
///
/// The requested direction is captured here so a late fulfillment resolves
/// into the direction it was issued for, whatever the market did since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub requested: Direction,
}

/// A random value delivered for a previously issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment {
    pub request_id: RequestId,
    pub random_value: RandomValue,
}

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("no variants configured for {0}")]
    EmptyVariantSet(Direction),

    #[error("variant {variant} is outside the catalog")]
    UnknownVariant { variant: VariantRef },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("randomness provider error: {0}")]
    Randomness(String),
}

/// Abstraction over an external randomness service (a VRF coordinator or similar).
///
/// `request` is fire-and-forget: the provider delivers the random value later,
/// at most once per request id, by whatever path the host wires into
/// `on_randomness_fulfilled`. Implementations must never deliver inline from
/// `request`: the caller still holds the engine state while it waits.
#[async_trait]
pub trait RandomnessProvider: Send + Sync {
    async fn request(&self, consumer_id: &str) -> Result<RequestId, VariantError>;
}
