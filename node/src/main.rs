mod config;

use std::sync::Arc;

use tokio::sync::mpsc;

use common::logger::init_logger;
use common::time::now_ms;
use market::oracle::{PriceOracle, ScriptedPriceFeed};
use registry::manager::ItemRegistry;
use registry::store::sqlite_store::SQLiteItemStore;
use upkeep::engine::UpkeepEngine;
use upkeep::runner::{spawn_fulfillment_loop, spawn_upkeep_loop};
use upkeep::types::{UpkeepConfig, UpkeepEvent};
use variant::catalog::VariantCatalog;
use variant::local::LocalRandomness;
use variant::selector::{FixedVariants, VariantSelector, VariantStrategy};
use variant::types::Fulfillment;

use config::{AppConfig, StrategyKind};

fn load_catalog(cfg: &AppConfig) -> anyhow::Result<VariantCatalog> {
    match &cfg.catalog_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(VariantCatalog::from_json(&raw)?)
        }
        None => Ok(VariantCatalog::default()),
    }
}

/// Logs every engine event; stands in for an indexer or metadata refresher.
fn start_event_sink(mut events: mpsc::Receiver<UpkeepEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UpkeepEvent::TokensUpdated {
                    trend,
                    variant,
                    items,
                } => tracing::info!(%trend, %variant, items, "tokens updated"),
                other => tracing::info!(event = ?other, "upkeep event"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    init_logger("bullbear", cfg.json_logs);

    tracing::info!(?cfg, "Starting Bull&Bear upkeep node...");

    let catalog = load_catalog(&cfg)?;

    let store = Arc::new(SQLiteItemStore::new(&cfg.database_url).await?);
    let registry = Arc::new(ItemRegistry::new(store, catalog).await?);

    let oracle: Arc<dyn PriceOracle> = Arc::new(ScriptedPriceFeed::parse(&cfg.price_script)?);

    let (strategy, deliveries) = match cfg.strategy {
        StrategyKind::Deterministic => (
            VariantStrategy::Deterministic(FixedVariants {
                bull: cfg.fixed_bull_index,
                bear: cfg.fixed_bear_index,
            }),
            None,
        ),
        StrategyKind::Randomized => {
            let (tx, rx) = mpsc::channel::<Fulfillment>(cfg.queue_capacity);
            let provider = LocalRandomness::new(cfg.randomness_seed, cfg.randomness_delay, tx);

            // The previous run's provider died with it; answer its request here.
            if let Some(pending) = registry.market().await?.and_then(|m| m.pending) {
                provider.redeliver(pending.request_id, &cfg.consumer_id).await;
            }

            (VariantStrategy::Randomized(Arc::new(provider)), Some(rx))
        }
    };

    let selector = VariantSelector::new(
        registry.catalog().clone(),
        strategy,
        cfg.consumer_id.clone(),
    )?;

    let (event_tx, event_rx) = mpsc::channel(cfg.queue_capacity);
    start_event_sink(event_rx);

    let engine = Arc::new(
        UpkeepEngine::bootstrap(
            UpkeepConfig::from_secs(cfg.upkeep_interval_secs),
            now_ms(),
            oracle,
            selector,
            registry.clone(),
        )
        .await?
        .with_events(event_tx),
    );

    if registry.total_supply().await == 0 {
        for i in 0..cfg.demo_items {
            engine.mint(format!("demo-owner-{}", i), now_ms()).await?;
        }
    }

    let upkeep = spawn_upkeep_loop(engine.clone(), cfg.upkeep_tick);
    let fulfillment = deliveries.map(|rx| spawn_fulfillment_loop(engine.clone(), rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    upkeep.abort();
    if let Some(handle) = fulfillment {
        handle.abort();
    }

    let snapshot = engine.snapshot().await;
    tracing::info!(?snapshot, "final market state");

    Ok(())
}
