use market::types::{Price, Trend};
use variant::types::{RequestRecord, VariantRef};

pub type ItemId = u64;

/// An issued item and the variant it currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub owner: String,
    pub variant: VariantRef,
    pub issued_at_ms: u64,
}

/// Durable copy of the collection-wide market state.
///
/// Stored next to the items so a variant change and the trend it belongs to
/// land in the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketRecord {
    pub stored_price: Price,
    pub last_evaluation_ms: u64,
    pub trend: Trend,
    pub variant_index: usize,
    pub pending: Option<RequestRecord>,
}
