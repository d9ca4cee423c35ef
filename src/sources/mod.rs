mod memory;
mod mtgox;

pub use memory::*;
pub use mtgox::*;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::{Selector, Trade};

/// A forward-only stream of trades, already filtered and sorted by the
/// source.
pub type TradeStream<'a> = BoxStream<'a, Result<Trade, SourceError>>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Trade storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Produces normalized trades for a selector. Each implementation owns the
/// mapping from its backing schema (field names, date encoding, side
/// encoding) into [`Trade`]; consumers only rely on the stream being
/// filtered to the selector and sorted ascending by timestamp. Exhaustion of
/// the stream is a normal end condition, not an error.
#[async_trait]
pub trait TradeSource: Send + Sync {
    const NAME: &'static str;

    async fn trades(&self, selector: &Selector) -> Result<TradeStream<'_>, SourceError>;
}
