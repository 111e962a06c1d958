//! SQLiteItemStore
//! ---------------
//! SQLite-backed implementation of `ItemStore`. Issued items, the variant
//! each one displays and the market state survive restarts. A variant change
//! rewrites every item row and the market row inside one transaction.
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};

use market::types::{Direction, Price, Trend};
use variant::types::{RequestId, RequestRecord, VariantRef};

use super::ItemStore;
use crate::model::{Item, MarketRecord};

/// The market state lives in a single row.
const MARKET_ROW_ID: i64 = 1;

fn parse_direction(raw: &str) -> anyhow::Result<Direction> {
    Direction::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Invalid variant direction '{}': {}", raw, e))
}

/// Prices are i128; SQLite integers are not, so they are stored as text.
fn upsert_market(market: &MarketRecord) -> Query<'static, Sqlite, SqliteArguments<'static>> {
    sqlx::query(
        r#"
        INSERT INTO market_state (
            id, stored_price, last_evaluation_ms, trend_direction, variant_index,
            pending_request_id, pending_direction
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            stored_price = excluded.stored_price,
            last_evaluation_ms = excluded.last_evaluation_ms,
            trend_direction = excluded.trend_direction,
            variant_index = excluded.variant_index,
            pending_request_id = excluded.pending_request_id,
            pending_direction = excluded.pending_direction;
    "#,
    )
    .bind(MARKET_ROW_ID)
    .bind(market.stored_price.to_string())
    .bind(market.last_evaluation_ms as i64)
    .bind(market.trend.direction().map(|d| d.to_string()))
    .bind(market.variant_index as i64)
    .bind(market.pending.map(|p| p.request_id.0 as i64))
    .bind(market.pending.map(|p| p.requested.to_string()))
}

fn market_from_row(row: &SqliteRow) -> anyhow::Result<MarketRecord> {
    let price_str: String = row.get("stored_price");
    let stored_price: Price = price_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid stored price '{}': {}", price_str, e))?;

    let trend = match row.get::<Option<String>, _>("trend_direction") {
        Some(raw) => Trend::from(parse_direction(&raw)?),
        None => Trend::Neutral,
    };

    let pending = match (
        row.get::<Option<i64>, _>("pending_request_id"),
        row.get::<Option<String>, _>("pending_direction"),
    ) {
        (Some(id), Some(raw)) => Some(RequestRecord {
            request_id: RequestId(id as u64),
            requested: parse_direction(&raw)?,
        }),
        (None, None) => None,
        _ => anyhow::bail!("market_state row has a half-written pending request"),
    };

    Ok(MarketRecord {
        stored_price,
        last_evaluation_ms: row.get::<i64, _>("last_evaluation_ms") as u64,
        trend,
        variant_index: row.get::<i64, _>("variant_index") as usize,
        pending,
    })
}

pub struct SQLiteItemStore {
    pool: SqlitePool,
}

impl SQLiteItemStore {
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Open (or create) the database at `url` and ensure the schema exists.
    ///
    /// A single connection is kept alive so `sqlite::memory:` behaves like one database.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                variant_direction TEXT NOT NULL,
                variant_index INTEGER NOT NULL,
                issued_at_ms INTEGER NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_state (
                id INTEGER PRIMARY KEY,
                stored_price TEXT NOT NULL,
                last_evaluation_ms INTEGER NOT NULL,
                trend_direction TEXT,
                variant_index INTEGER NOT NULL,
                pending_request_id INTEGER,
                pending_direction TEXT
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ItemStore for SQLiteItemStore {
    async fn load_all(&self) -> anyhow::Result<Vec<Item>> {
        let rows = sqlx::query("SELECT * FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(rows.len());

        for row in rows {
            let direction_str: String = row.get("variant_direction");
            let direction = parse_direction(&direction_str)?;

            items.push(Item {
                id: row.get::<i64, _>("id") as u64,
                owner: row.get("owner"),
                variant: VariantRef::new(direction, row.get::<i64, _>("variant_index") as usize),
                issued_at_ms: row.get::<i64, _>("issued_at_ms") as u64,
            });
        }

        Ok(items)
    }

    /// Insert or update one item.
    async fn save(&self, item: &Item) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, owner, variant_direction, variant_index, issued_at_ms)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner = excluded.owner,
                variant_direction = excluded.variant_direction,
                variant_index = excluded.variant_index,
                issued_at_ms = excluded.issued_at_ms;
        "#,
        )
        .bind(item.id as i64)
        .bind(&item.owner)
        .bind(item.variant.direction.to_string())
        .bind(item.variant.index as i64)
        .bind(item.issued_at_ms as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_variant(
        &self,
        variant: &VariantRef,
        expected: u64,
        market: &MarketRecord,
    ) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE items SET variant_direction = ?, variant_index = ?")
            .bind(variant.direction.to_string())
            .bind(variant.index as i64)
            .execute(&mut *tx)
            .await?;

        // Dropping the transaction rolls the update back.
        if result.rows_affected() != expected {
            anyhow::bail!(
                "variant update touched {} rows, expected {}",
                result.rows_affected(),
                expected
            );
        }

        upsert_market(market).execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn load_market(&self) -> anyhow::Result<Option<MarketRecord>> {
        let row = sqlx::query("SELECT * FROM market_state WHERE id = ?")
            .bind(MARKET_ROW_ID)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(market_from_row).transpose()
    }

    async fn save_market(&self, market: &MarketRecord) -> anyhow::Result<()> {
        upsert_market(market).execute(&self.pool).await?;
        Ok(())
    }
}
