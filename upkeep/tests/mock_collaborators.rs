#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use market::oracle::{ManualPriceFeed, PriceOracle};
use market::types::Price;
use registry::manager::ItemRegistry;
use registry::model::{Item, ItemId, MarketRecord};
use registry::store::ItemStore;
use upkeep::engine::UpkeepEngine;
use upkeep::types::UpkeepConfig;
use variant::catalog::VariantCatalog;
use variant::selector::{FixedVariants, VariantSelector, VariantStrategy};
use variant::types::{RandomnessProvider, RequestId, VariantError, VariantRef};

pub const INTERVAL_MS: u64 = 60_000;
pub const BASELINE: Price = 3_000_000_000_000;
pub const T0: u64 = 1_700_000_000_000;

#[derive(Default)]
pub struct InMemoryItemStore {
    pub map: Arc<Mutex<HashMap<ItemId, Item>>>,
    pub market: Mutex<Option<MarketRecord>>,
    pub fail_writes: AtomicBool,
}

impl InMemoryItemStore {
    fn check(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn load_all(&self) -> anyhow::Result<Vec<Item>> {
        Ok(self.map.lock().await.values().cloned().collect())
    }

    async fn save(&self, item: &Item) -> anyhow::Result<()> {
        self.map.lock().await.insert(item.id, item.clone());
        Ok(())
    }

    async fn apply_variant(
        &self,
        variant: &VariantRef,
        expected: u64,
        market: &MarketRecord,
    ) -> anyhow::Result<u64> {
        self.check()?;
        let mut map = self.map.lock().await;
        if map.len() as u64 != expected {
            anyhow::bail!("store holds {} items, expected {}", map.len(), expected);
        }
        for item in map.values_mut() {
            item.variant = *variant;
        }
        *self.market.lock().await = Some(*market);
        Ok(map.len() as u64)
    }

    async fn load_market(&self) -> anyhow::Result<Option<MarketRecord>> {
        Ok(*self.market.lock().await)
    }

    async fn save_market(&self, market: &MarketRecord) -> anyhow::Result<()> {
        self.check()?;
        *self.market.lock().await = Some(*market);
        Ok(())
    }
}

/// Randomness provider that only hands out ids; tests deliver values by hand.
#[derive(Default)]
pub struct ManualRandomness {
    pub issued: AtomicU64,
    pub fail: AtomicBool,
}

impl ManualRandomness {
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RandomnessProvider for ManualRandomness {
    async fn request(&self, _consumer_id: &str) -> Result<RequestId, VariantError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(VariantError::Randomness("coordinator unreachable".into()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RequestId(n))
    }
}

fn selector(randomized: bool, randomness: &Arc<ManualRandomness>) -> anyhow::Result<VariantSelector> {
    let strategy = if randomized {
        VariantStrategy::Randomized(randomness.clone())
    } else {
        VariantStrategy::Deterministic(FixedVariants::default())
    };
    Ok(VariantSelector::new(VariantCatalog::default(), strategy, "bull-bear-test")?)
}

pub struct Harness {
    pub engine: UpkeepEngine<InMemoryItemStore>,
    pub store: Arc<InMemoryItemStore>,
    pub feed: Arc<ManualPriceFeed>,
    pub randomness: Arc<ManualRandomness>,
    pub randomized: bool,
}

impl Harness {
    pub async fn deterministic() -> anyhow::Result<Self> {
        Self::build(false).await
    }

    pub async fn randomized() -> anyhow::Result<Self> {
        Self::build(true).await
    }

    async fn build(randomized: bool) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryItemStore::default());
        let registry = Arc::new(ItemRegistry::new(store.clone(), VariantCatalog::default()).await?);
        let feed = Arc::new(ManualPriceFeed::new(BASELINE));
        let randomness = Arc::new(ManualRandomness::default());

        let oracle: Arc<dyn PriceOracle> = feed.clone();
        let engine = UpkeepEngine::new(
            UpkeepConfig {
                interval_ms: INTERVAL_MS,
            },
            BASELINE,
            T0,
            oracle,
            selector(randomized, &randomness)?,
            registry,
        )?;

        Ok(Self {
            engine,
            store,
            feed,
            randomness,
            randomized,
        })
    }

    /// Drop the engine and bring a new one up over the same store, feed and provider.
    pub async fn restart(self, now_ms: u64) -> anyhow::Result<Self> {
        let Harness {
            engine,
            store,
            feed,
            randomness,
            randomized,
        } = self;
        drop(engine);

        let registry = Arc::new(ItemRegistry::new(store.clone(), VariantCatalog::default()).await?);
        let oracle: Arc<dyn PriceOracle> = feed.clone();
        let engine = UpkeepEngine::bootstrap(
            UpkeepConfig {
                interval_ms: INTERVAL_MS,
            },
            now_ms,
            oracle,
            selector(randomized, &randomness)?,
            registry,
        )
        .await?;

        Ok(Self {
            engine,
            store,
            feed,
            randomness,
            randomized,
        })
    }

    /// Issue `n` items to distinct owners.
    pub async fn mint(&self, n: usize) -> anyhow::Result<()> {
        for i in 0..n {
            self.engine.mint(format!("owner-{}", i), T0).await?;
        }
        Ok(())
    }

    pub async fn variants(&self) -> Vec<VariantRef> {
        self.engine
            .registry()
            .variants()
            .await
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    }
}
