use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the book the taker hit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

/// One executed market transaction, normalized from whatever schema the
/// source stores. Timestamps are unix seconds and must arrive non-decreasing
/// within one source stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: i64,
    pub side: Side,
    pub amount: Decimal,
    pub price: Decimal,
}
