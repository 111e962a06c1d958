pub mod sqlite_store;

use variant::types::VariantRef;

use crate::model::{Item, MarketRecord};

#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    async fn load_all(&self) -> anyhow::Result<Vec<Item>>;
    async fn save(&self, item: &Item) -> anyhow::Result<()>;

    /// Point every stored item at `variant` and record `market`, all or nothing.
    ///
    /// Fails without writing anything unless exactly `expected` rows would change.
    /// Returns the number of rows touched.
    async fn apply_variant(
        &self,
        variant: &VariantRef,
        expected: u64,
        market: &MarketRecord,
    ) -> anyhow::Result<u64>;

    async fn load_market(&self) -> anyhow::Result<Option<MarketRecord>>;
    async fn save_market(&self, market: &MarketRecord) -> anyhow::Result<()>;
}
