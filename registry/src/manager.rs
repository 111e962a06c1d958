use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use variant::catalog::VariantCatalog;
use variant::types::VariantRef;

use crate::error::RegistryError;
use crate::model::{Item, ItemId, MarketRecord};
use crate::store::ItemStore;

/// In-memory view of every issued item, persisted through an `ItemStore`.
///
/// All reads and writes go through one lock, so a batch variant change is
/// observed either on every item or on none.
pub struct ItemRegistry<S: ItemStore> {
    items: Arc<Mutex<BTreeMap<ItemId, Item>>>,
    catalog: VariantCatalog,
    store: Arc<S>,
}

impl<S: ItemStore> ItemRegistry<S> {
    /// Initialize from the store (load_all).
    pub async fn new(store: Arc<S>, catalog: VariantCatalog) -> anyhow::Result<Self> {
        let registry = Self {
            items: Arc::new(Mutex::new(BTreeMap::new())),
            catalog,
            store,
        };

        registry.restore_from_store().await?;
        Ok(registry)
    }

    async fn restore_from_store(&self) -> anyhow::Result<()> {
        let all = self.store.load_all().await?;
        let mut items = self.items.lock().await;

        for item in all {
            if self.catalog.uri(&item.variant).is_none() {
                anyhow::bail!(RegistryError::UnknownVariant(item.variant));
            }
            items.insert(item.id, item);
        }

        tracing::debug!(count = items.len(), "items restored");
        Ok(())
    }

    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    /// Issue a new item showing `variant`. Ids are sequential from 0.
    pub async fn issue(
        &self,
        owner: impl Into<String>,
        variant: VariantRef,
        now_ms: u64,
    ) -> anyhow::Result<ItemId> {
        if self.catalog.uri(&variant).is_none() {
            anyhow::bail!(RegistryError::UnknownVariant(variant));
        }

        let mut items = self.items.lock().await;
        let id = items.keys().next_back().map_or(0, |last| last + 1);

        let item = Item {
            id,
            owner: owner.into(),
            variant,
            issued_at_ms: now_ms,
        };

        // Persist first; memory only changes once the store accepted it.
        self.store.save(&item).await?;
        items.insert(id, item);

        tracing::info!(item_id = id, variant = %variant, "item issued");
        Ok(id)
    }

    /// Point every issued item at `variant` in one step and record the
    /// market state that goes with it.
    ///
    /// If the store rejects the batch, no item changes.
    pub async fn apply_to_all(
        &self,
        variant: VariantRef,
        market: &MarketRecord,
    ) -> anyhow::Result<usize> {
        if self.catalog.uri(&variant).is_none() {
            anyhow::bail!(RegistryError::UnknownVariant(variant));
        }

        let mut items = self.items.lock().await;
        let in_memory = items.len();

        let persisted = self
            .store
            .apply_variant(&variant, in_memory as u64, market)
            .await?;
        if persisted as usize != in_memory {
            anyhow::bail!(RegistryError::OutOfSync {
                persisted,
                in_memory
            });
        }

        for item in items.values_mut() {
            item.variant = variant;
        }

        Ok(in_memory)
    }

    /// Market state saved by the last accepted evaluation, if any.
    pub async fn market(&self) -> anyhow::Result<Option<MarketRecord>> {
        self.store.load_market().await
    }

    /// Record market state that does not change any item.
    pub async fn record_market(&self, market: &MarketRecord) -> anyhow::Result<()> {
        self.store.save_market(market).await
    }

    pub async fn total_supply(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn ids(&self) -> Vec<ItemId> {
        self.items.lock().await.keys().copied().collect()
    }

    pub async fn get(&self, id: ItemId) -> Option<Item> {
        self.items.lock().await.get(&id).cloned()
    }

    /// Variant per item, read under a single lock.
    pub async fn variants(&self) -> Vec<(ItemId, VariantRef)> {
        self.items
            .lock()
            .await
            .values()
            .map(|item| (item.id, item.variant))
            .collect()
    }

    /// The asset URI the metadata layer should serve for `id`.
    pub async fn token_uri(&self, id: ItemId) -> Result<String, RegistryError> {
        let items = self.items.lock().await;
        let item = items.get(&id).ok_or(RegistryError::NonexistentItem(id))?;

        self.catalog
            .uri(&item.variant)
            .map(str::to_string)
            .ok_or(RegistryError::UnknownVariant(item.variant))
    }
}
