use futures_util::{stream, Stream, StreamExt};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{sources::SourceError, Candle, Trade};

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Interval must be a positive number of seconds, got {0}.")]
    InvalidInterval(i64),
}

/// Optional closed `[start, end]` restriction on the trades considered.
/// `start` also fixes the anchor for bucket boundaries; `end` is inclusive
/// of the bucket that contains it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Result of feeding one trade to the [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// The trade joined the current bucket, nothing to emit yet.
    Pending,
    /// The trade crossed a bucket boundary and closed the previous bucket.
    Candle(Candle),
    /// The trade lies beyond the window end. No further trades will be
    /// accepted; the in-progress bucket is flushed if it was non-empty.
    Done(Option<Candle>),
}

// Running OHLC for the bucket currently receiving trades.
struct Bucket {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
}

impl Bucket {
    fn open(price: Decimal) -> Self {
        Bucket {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    fn fold(&mut self, price: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    fn into_candle(self, bucket_start: i64, interval: i64) -> Candle {
        Candle {
            bucket_start,
            interval,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }
}

/// Streaming trade-to-candle state machine. Consumes trades ordered
/// non-decreasing by timestamp and emits one candle per non-empty bucket of
/// `interval` seconds, holding only the current bucket in memory. Trades are
/// never re-sorted; feeding an out-of-order stream produces unspecified
/// candles.
///
/// Bucket `k` spans `[anchor + k*interval, anchor + (k+1)*interval)`, end
/// exclusive, where the anchor is `window.start` if given and the first
/// trade's timestamp otherwise. Trades earlier than the anchor fall into the
/// first bucket since the grid never moves backwards.
pub struct Aggregator {
    interval: i64,
    window_end: Option<i64>,
    // (bucket_start, bucket_end), established by window.start or the first trade.
    grid: Option<(i64, i64)>,
    bucket: Option<Bucket>,
    done: bool,
}

impl Aggregator {
    /// Fails with [`AggregateError::InvalidInterval`] before consuming any
    /// input if `interval` is not strictly positive.
    pub fn new(interval: i64, window: Window) -> Result<Self, AggregateError> {
        if interval <= 0 {
            return Err(AggregateError::InvalidInterval(interval));
        }

        Ok(Aggregator {
            interval,
            window_end: window.end,
            grid: window.start.map(|anchor| (anchor, anchor + interval)),
            bucket: None,
            done: false,
        })
    }

    pub fn update(&mut self, trade: &Trade) -> Update {
        if self.done {
            return Update::Done(None);
        }

        if let Some(end) = self.window_end {
            if trade.timestamp > end {
                self.done = true;
                return Update::Done(self.flush());
            }
        }

        let (bucket_start, bucket_end) = match self.grid {
            Some(grid) => grid,
            None => {
                let grid = (trade.timestamp, trade.timestamp + self.interval);
                self.grid = Some(grid);
                grid
            }
        };

        let mut closed = None;
        if trade.timestamp >= bucket_end {
            closed = self.flush();
            // Jump the grid straight to the bucket containing this trade.
            // Empty intervals in between emit nothing but stay anchored.
            let steps = 1 + (trade.timestamp - bucket_end).div_euclid(self.interval);
            let bucket_start = bucket_start + steps * self.interval;
            self.grid = Some((bucket_start, bucket_start + self.interval));
        }

        match &mut self.bucket {
            Some(bucket) => bucket.fold(trade.price),
            None => self.bucket = Some(Bucket::open(trade.price)),
        }

        match closed {
            Some(candle) => Update::Candle(candle),
            None => Update::Pending,
        }
    }

    /// Flushes the trailing bucket once the trade stream is exhausted.
    pub fn finish(&mut self) -> Option<Candle> {
        self.done = true;
        self.flush()
    }

    fn flush(&mut self) -> Option<Candle> {
        let (bucket_start, _) = self.grid?;
        Some(self.bucket.take()?.into_candle(bucket_start, self.interval))
    }
}

/// Lazily aggregates a stream of trades into a stream of candles.
///
/// Candles are produced on demand as the input is pulled; dropping the output
/// early simply stops pulling, no partial bucket is emitted. An upstream
/// error passes through unchanged and ends the stream, discarding the
/// in-progress bucket.
pub fn candles<S>(
    trades: S,
    interval: i64,
    window: Window,
) -> Result<impl Stream<Item = Result<Candle, SourceError>>, AggregateError>
where
    S: Stream<Item = Result<Trade, SourceError>>,
{
    let aggregator = Aggregator::new(interval, window)?;

    Ok(stream::unfold(
        (Box::pin(trades), aggregator, false),
        |(mut trades, mut aggregator, done)| async move {
            if done {
                return None;
            }

            loop {
                match trades.next().await {
                    Some(Ok(trade)) => match aggregator.update(&trade) {
                        Update::Pending => continue,
                        Update::Candle(candle) => {
                            return Some((Ok(candle), (trades, aggregator, false)))
                        }
                        Update::Done(Some(candle)) => {
                            return Some((Ok(candle), (trades, aggregator, true)))
                        }
                        Update::Done(None) => return None,
                    },
                    Some(Err(err)) => return Some((Err(err), (trades, aggregator, true))),
                    None => {
                        let candle = aggregator.finish()?;
                        return Some((Ok(candle), (trades, aggregator, true)));
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Side;
    use rand::Rng;
    use rust_decimal_macros::dec;

    fn trade(timestamp: i64, price: Decimal) -> Trade {
        Trade {
            timestamp,
            side: Side::Bid,
            amount: dec!(1),
            price,
        }
    }

    fn run(trades: &[Trade], interval: i64, window: Window) -> Vec<Candle> {
        let mut aggregator = Aggregator::new(interval, window).unwrap();
        let mut out = Vec::new();
        for trade in trades {
            match aggregator.update(trade) {
                Update::Pending => {}
                Update::Candle(candle) => out.push(candle),
                Update::Done(candle) => {
                    out.extend(candle);
                    return out;
                }
            }
        }
        out.extend(aggregator.finish());
        out
    }

    #[test]
    fn rejects_non_positive_interval() {
        assert!(matches!(
            Aggregator::new(0, Window::default()),
            Err(AggregateError::InvalidInterval(0))
        ));
        assert!(matches!(
            Aggregator::new(-60, Window::default()),
            Err(AggregateError::InvalidInterval(-60))
        ));
    }

    #[test]
    fn empty_input() {
        assert!(run(&[], 60, Window::default()).is_empty());
        assert!(run(
            &[],
            60,
            Window {
                start: Some(0),
                end: None
            }
        )
        .is_empty());
    }

    #[test]
    fn single_trade_candle() {
        let candles = run(&[trade(100, dec!(50))], 60, Window::default());
        assert_eq!(
            candles,
            vec![Candle {
                bucket_start: 100,
                interval: 60,
                open: dec!(50),
                high: dec!(50),
                low: dec!(50),
                close: dec!(50),
            }]
        );
    }

    #[test]
    fn ohlc_within_bucket() {
        let trades = [
            trade(0, dec!(10)),
            trade(1, dec!(15)),
            trade(2, dec!(5)),
            trade(3, dec!(12)),
        ];
        let candles = run(&trades, 3600, Window::default());
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open, dec!(10));
        assert_eq!(candles[0].high, dec!(15));
        assert_eq!(candles[0].low, dec!(5));
        assert_eq!(candles[0].close, dec!(12));
    }

    #[test]
    fn skips_empty_buckets() {
        // 8000 lands in [7200, 10800); [3600, 7200) saw no trades and
        // produces no candle, but the grid stays anchored at 0.
        let trades = [trade(0, dec!(1)), trade(0, dec!(2)), trade(8000, dec!(3))];
        let candles = run(&trades, 3600, Window::default());
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].bucket_start, 0);
        assert_eq!(candles[0].open, dec!(1));
        assert_eq!(candles[0].close, dec!(2));
        assert_eq!(candles[1].bucket_start, 7200);
        assert_eq!(candles[1].open, dec!(3));
    }

    #[test]
    fn window_end_truncates() {
        // The trade at 150 is past the window and must not start a bucket.
        let trades = [trade(0, dec!(10)), trade(50, dec!(11)), trade(150, dec!(12))];
        let candles = run(
            &trades,
            100,
            Window {
                start: None,
                end: Some(120),
            },
        );
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].bucket_start, 0);
        assert_eq!(candles[0].open, dec!(10));
        assert_eq!(candles[0].close, dec!(11));
    }

    #[test]
    fn trade_at_window_end_included() {
        // Only strictly-greater timestamps terminate consumption.
        let trades = [trade(0, dec!(10)), trade(120, dec!(11))];
        let candles = run(
            &trades,
            100,
            Window {
                start: None,
                end: Some(120),
            },
        );
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].bucket_start, 0);
        assert_eq!(candles[1].bucket_start, 100);
        assert_eq!(candles[1].open, dec!(11));
    }

    #[test]
    fn window_start_anchors_grid() {
        // Trades earlier than the anchor land in the first bucket.
        let trades = [trade(40, dec!(1)), trade(60, dec!(2)), trade(170, dec!(3))];
        let candles = run(
            &trades,
            100,
            Window {
                start: Some(50),
                end: None,
            },
        );
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].bucket_start, 50);
        assert_eq!(candles[0].open, dec!(1));
        assert_eq!(candles[0].close, dec!(2));
        assert_eq!(candles[1].bucket_start, 150);
        assert_eq!(candles[1].open, dec!(3));
    }

    #[test]
    fn randomized_invariants() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let interval = rng.gen_range(1..400);
            let count = rng.gen_range(1..200);
            let mut timestamp = rng.gen_range(0..1000);
            let mut trades = Vec::with_capacity(count);
            for _ in 0..count {
                timestamp += rng.gen_range(0..500);
                trades.push(trade(timestamp, Decimal::from(rng.gen_range(1i64..10_000))));
            }

            let anchor = trades[0].timestamp;
            let candles = run(&trades, interval, Window::default());
            assert!(!candles.is_empty());

            for pair in candles.windows(2) {
                assert!(pair[0].bucket_start < pair[1].bucket_start);
                assert_eq!((pair[1].bucket_start - pair[0].bucket_start) % interval, 0);
            }
            for candle in &candles {
                assert_eq!((candle.bucket_start - anchor).rem_euclid(interval), 0);
                assert!(candle.low <= candle.open);
                assert!(candle.low <= candle.close);
                assert!(candle.low <= candle.high);
                assert!(candle.high >= candle.open);
                assert!(candle.high >= candle.close);
            }

            // Re-running over the same input yields the same series.
            assert_eq!(candles, run(&trades, interval, Window::default()));
        }
    }

    #[tokio::test]
    async fn stream_matches_state_machine() {
        let trades = [
            trade(0, dec!(10)),
            trade(30, dec!(12)),
            trade(90, dec!(9)),
            trade(400, dec!(14)),
        ];
        let expected = run(&trades, 60, Window::default());

        let stream = candles(
            stream::iter(trades.into_iter().map(Ok)),
            60,
            Window::default(),
        )
        .unwrap();
        let collected: Vec<Candle> = stream.map(|candle| candle.unwrap()).collect().await;

        assert_eq!(collected, expected);
    }

    #[tokio::test]
    async fn upstream_error_passes_through() {
        let input = stream::iter(vec![
            Ok(trade(0, dec!(10))),
            Err(SourceError::Storage(sqlx::Error::RowNotFound)),
            Ok(trade(5, dec!(11))),
        ]);

        let stream = candles(input, 60, Window::default()).unwrap();
        let collected: Vec<Result<Candle, SourceError>> = stream.collect().await;

        // The first error ends the stream; the buffered bucket is dropped.
        assert_eq!(collected.len(), 1);
        assert!(collected[0].is_err());
    }

    #[tokio::test]
    async fn invalid_interval_fails_before_consuming() {
        let input = stream::iter(vec![Ok(trade(0, dec!(10)))]);
        assert!(candles(input, 0, Window::default()).is_err());
    }
}
