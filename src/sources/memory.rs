use async_trait::async_trait;
use futures_util::{stream, StreamExt};

use crate::{
    sources::{SourceError, TradeSource, TradeStream},
    Selector, Trade,
};

/// In-memory trade source holding a single item/currency pair, useful for
/// tests and small backfills. The selector's pair is not re-checked.
pub struct Memory {
    trades: Vec<Trade>,
}

impl Memory {
    pub fn new(mut trades: Vec<Trade>) -> Self {
        // Stable sort keeps arrival order within one second.
        trades.sort_by_key(|trade| trade.timestamp);
        Memory { trades }
    }
}

#[async_trait]
impl TradeSource for Memory {
    const NAME: &'static str = "Memory";

    async fn trades(&self, selector: &Selector) -> Result<TradeStream<'_>, SourceError> {
        let start = selector.start.unwrap_or(i64::MIN);
        let end = selector.end.unwrap_or(i64::MAX);

        let trades: Vec<Trade> = self
            .trades
            .iter()
            .copied()
            .filter(|trade| trade.timestamp >= start && trade.timestamp <= end)
            .collect();

        Ok(stream::iter(trades.into_iter().map(Ok)).boxed())
    }
}
