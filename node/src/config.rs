use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    Deterministic,
    Randomized,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deterministic" => Ok(StrategyKind::Deterministic),
            "randomized" => Ok(StrategyKind::Randomized),
            other => Err(anyhow::anyhow!("Invalid VARIANT_STRATEGY value: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Item store connection string.
    pub database_url: String,

    // =========================
    // Upkeep configuration
    // =========================
    /// Minimum spacing between accepted trend evaluations.
    pub upkeep_interval_secs: u64,

    /// How often the upkeep loop knocks on the gate.
    ///
    /// Only bounds reaction latency; the interval decides what is accepted.
    pub upkeep_tick: Duration,

    // =========================
    // Variant selection
    // =========================
    pub strategy: StrategyKind,

    /// Asset index per direction for the deterministic strategy.
    pub fixed_bull_index: usize,
    pub fixed_bear_index: usize,

    /// Optional JSON catalog (`{"bull": [...], "bear": [...]}`); the built-in one otherwise.
    pub catalog_path: Option<String>,

    /// Identifier presented to the randomness provider.
    pub consumer_id: String,

    /// Delivery delay of the local randomness provider.
    pub randomness_delay: Duration,
    pub randomness_seed: u64,

    // =========================
    // Price feed
    // =========================
    /// Comma separated answers the local feed replays, one per read.
    pub price_script: String,

    // =========================
    // Misc
    // =========================
    /// Items issued at startup when the store is empty.
    pub demo_items: usize,

    /// Capacity of the event and delivery channels.
    pub queue_capacity: usize,

    pub json_logs: bool,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid {}='{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://bullbear_dev.db".to_string());

        Ok(Self {
            database_url,

            // One evaluation per minute, polled every second.
            upkeep_interval_secs: env_or("UPKEEP_INTERVAL_SECS", 60)?,
            upkeep_tick: Duration::from_millis(env_or("UPKEEP_TICK_MS", 1_000)?),

            strategy: env_or("VARIANT_STRATEGY", StrategyKind::Randomized)?,
            fixed_bull_index: env_or("FIXED_BULL_INDEX", 0)?,
            fixed_bear_index: env_or("FIXED_BEAR_INDEX", 0)?,
            catalog_path: std::env::var("VARIANT_CATALOG").ok(),
            consumer_id: std::env::var("CONSUMER_ID").unwrap_or_else(|_| "bull-bear".to_string()),
            randomness_delay: Duration::from_millis(env_or("RANDOMNESS_DELAY_MS", 2_000)?),
            randomness_seed: env_or("RANDOMNESS_SEED", 52)?,

            price_script: std::env::var("PRICE_SCRIPT").unwrap_or_else(|_| {
                "3000000000000,3000010000000,3000020000000,2999990000000,2999980000000".to_string()
            }),

            demo_items: env_or("DEMO_ITEMS", 3)?,
            queue_capacity: env_or("QUEUE_CAPACITY", 256)?,
            json_logs: std::env::var("APP_ENV").unwrap_or_default() == "production",
        })
    }
}
