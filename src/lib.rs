#![deny(unused_must_use)]
#![deny(unsafe_code)]
#![allow(clippy::new_without_default)]

mod aggregate;
mod candle;
pub mod output;
mod selector;
pub mod sources;
mod trade;

pub use aggregate::*;
pub use candle::*;
pub use selector::*;
pub use trade::*;

use futures_util::TryStreamExt;
use sources::{SourceError, TradeSource};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Ties a trade source and the aggregator together for the common case of
/// draining one item/currency pair into a candle series.
pub struct Candelize {
    pub interval: i64,
    pub window: Window,
}

impl Default for Candelize {
    fn default() -> Self {
        Candelize {
            interval: 3600,
            window: Window::default(),
        }
    }
}

impl Candelize {
    pub async fn run<S: TradeSource>(
        &self,
        source: &S,
        item: Asset,
        currency: Asset,
    ) -> Result<Vec<Candle>, Error> {
        let selector = Selector {
            item,
            currency,
            start: self.window.start,
            end: self.window.end,
        };

        let trades = source.trades(&selector).await?;
        let series: Vec<Candle> = candles(trades, self.interval, self.window)?
            .try_collect()
            .await?;

        log::debug!(
            "Aggregated {} candles for {} from {}.",
            series.len(),
            selector,
            S::NAME
        );

        Ok(series)
    }
}
