//! Variant selection.
//!
//! Given a direction the market just flipped into, decide which asset the
//! items should show. The strategy is fixed at construction:
//!   - Deterministic: one hand-picked asset per direction, decided immediately.
//!   - Randomized: ask the randomness provider, decide when the value arrives.

use std::fmt;
use std::sync::Arc;

use market::types::Direction;

use crate::catalog::VariantCatalog;
use crate::types::{
    RandomValue, RandomnessProvider, RequestRecord, VariantError, VariantRef,
};

/// Fixed index per direction for the deterministic strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedVariants {
    pub bull: usize,
    pub bear: usize,
}

impl FixedVariants {
    pub fn index(&self, direction: Direction) -> usize {
        match direction {
            Direction::Bull => self.bull,
            Direction::Bear => self.bear,
        }
    }
}

#[derive(Clone)]
pub enum VariantStrategy {
    Deterministic(FixedVariants),
    Randomized(Arc<dyn RandomnessProvider>),
}

impl fmt::Debug for VariantStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantStrategy::Deterministic(fixed) => {
                f.debug_tuple("Deterministic").field(fixed).finish()
            }
            VariantStrategy::Randomized(_) => f.write_str("Randomized"),
        }
    }
}

/// What selection produced for a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Apply now, in the same evaluation.
    Immediate(VariantRef),
    /// Wait for the provider to fulfill this request.
    Deferred(RequestRecord),
}

/// Maps a random word onto one of `count` variants.
///
/// `count` must be non-zero; the catalog guarantees it.
pub fn variant_index(random_value: RandomValue, count: usize) -> usize {
    (random_value % count as u64) as usize
}

#[derive(Debug, Clone)]
pub struct VariantSelector {
    catalog: VariantCatalog,
    strategy: VariantStrategy,
    consumer_id: String,
}

impl VariantSelector {
    /// Fails if a deterministic index points outside the catalog.
    pub fn new(
        catalog: VariantCatalog,
        strategy: VariantStrategy,
        consumer_id: impl Into<String>,
    ) -> Result<Self, VariantError> {
        if let VariantStrategy::Deterministic(fixed) = &strategy {
            for direction in [Direction::Bull, Direction::Bear] {
                catalog.check(VariantRef::new(direction, fixed.index(direction)))?;
            }
        }

        Ok(Self {
            catalog,
            strategy,
            consumer_id: consumer_id.into(),
        })
    }

    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self.strategy, VariantStrategy::Randomized(_))
    }

    /// Decide (or start deciding) the variant for a flip into `direction`.
    ///
    /// The randomized path issues exactly one provider request and returns its record.
    pub async fn select(&self, direction: Direction) -> Result<Selection, VariantError> {
        match &self.strategy {
            VariantStrategy::Deterministic(fixed) => Ok(Selection::Immediate(VariantRef::new(
                direction,
                fixed.index(direction),
            ))),
            VariantStrategy::Randomized(provider) => {
                let request_id = provider.request(&self.consumer_id).await?;

                tracing::debug!(
                    request_id = %request_id,
                    direction = %direction,
                    consumer = %self.consumer_id,
                    "randomness requested"
                );

                Ok(Selection::Deferred(RequestRecord {
                    request_id,
                    requested: direction,
                }))
            }
        }
    }

    /// Turn a fulfilled request into the variant to apply.
    pub fn resolve(&self, record: &RequestRecord, random_value: RandomValue) -> VariantRef {
        let count = self.catalog.count(record.requested);
        VariantRef::new(record.requested, variant_index(random_value, count))
    }

    pub fn uri(&self, variant: &VariantRef) -> Option<&str> {
        self.catalog.uri(variant)
    }
}
