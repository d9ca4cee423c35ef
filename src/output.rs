//! Renders a candle series for human or downstream consumption. The
//! aggregator itself never formats anything; everything here consumes the
//! finished series by iteration.

use std::{io, str::FromStr};

use chrono::{TimeZone, Utc};

use crate::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Pretty,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

pub fn write_csv<W: io::Write>(mut w: W, candles: &[Candle]) -> io::Result<()> {
    writeln!(w, "bucket_start,open,high,low,close")?;
    for candle in candles {
        writeln!(
            w,
            "{},{},{},{},{}",
            candle.bucket_start, candle.open, candle.high, candle.low, candle.close
        )?;
    }
    Ok(())
}

pub fn write_json<W: io::Write>(mut w: W, candles: &[Candle]) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut w, candles)?;
    writeln!(w).map_err(serde_json::Error::io)
}

pub fn write_pretty<W: io::Write>(mut w: W, candles: &[Candle]) -> io::Result<()> {
    for candle in candles {
        writeln!(
            w,
            "{} ({}s)  open {:>12}  high {:>12}  low {:>12}  close {:>12}",
            Utc.timestamp(candle.bucket_start, 0).format("%Y-%m-%d %H:%M:%S"),
            candle.interval,
            candle.open,
            candle.high,
            candle.low,
            candle.close,
        )?;
    }
    Ok(())
}
