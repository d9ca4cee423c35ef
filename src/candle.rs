use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLC summary of all trades whose timestamp fell in
/// `[bucket_start, bucket_start + interval)`. Only produced for buckets that
/// saw at least one trade, so `low <= open, close <= high` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub bucket_start: i64,
    pub interval: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} +{}s] o {} h {} l {} c {}",
            self.bucket_start, self.interval, self.open, self.high, self.low, self.close
        )
    }
}
