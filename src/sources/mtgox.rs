use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqliteRow, ConnectOptions, Row, SqlitePool};

use crate::{
    sources::{SourceError, TradeSource, TradeStream},
    Selector, Trade,
};

const TRADES_SQL: &str = "
    SELECT date, price_int, amount_int, type
    FROM trades
    WHERE item = $1
    AND currency = $2
    AND date >= $3
    AND date <= $4
    ORDER BY date ASC
";

/// Reads trades out of a Mt. Gox SQLite dump, mapping its schema into
/// normalized [`Trade`] records. Rows are streamed off a lazy cursor, so the
/// whole dump is never held in memory.
pub struct MtGox {
    pool: SqlitePool,
}

impl MtGox {
    /// Opens an existing dump file read-only.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let mut options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .read_only(true);

        options.disable_statement_logging();

        let pool = SqlitePool::connect_with(options).await?;

        Ok(MtGox { pool })
    }
}

#[async_trait]
impl TradeSource for MtGox {
    const NAME: &'static str = "Mt. Gox";

    async fn trades(&self, selector: &Selector) -> Result<TradeStream<'_>, SourceError> {
        log::trace!("Streaming {} trades for {}.", Self::NAME, selector);

        let stream = sqlx::query(TRADES_SQL)
            .bind(selector.item.as_str())
            .bind(selector.currency.as_str())
            .bind(selector.start.unwrap_or(i64::MIN))
            .bind(selector.end.unwrap_or(i64::MAX))
            .fetch(&self.pool)
            .map(|row| decode_trade(row?))
            .boxed();

        Ok(stream)
    }
}

// The dump stores fixed-point integers: prices in 1e-5 units of the
// currency, amounts in 1e-8 BTC.
fn decode_trade(row: SqliteRow) -> Result<Trade, SourceError> {
    let price_int: i64 = row.try_get("price_int")?;
    let amount_int: i64 = row.try_get("amount_int")?;

    Ok(Trade {
        timestamp: row.try_get("date")?,
        side: row.try_get("type")?,
        amount: Decimal::new(amount_int, 8),
        price: Decimal::new(price_int, 5),
    })
}
