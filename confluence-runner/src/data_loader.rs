//! Candle loading for the runner.
//!
//! Two sources:
//! 1. CSV files with a `time,open,high,low,close,volume` header, where `time`
//!    is epoch seconds, epoch milliseconds or an RFC 3339 timestamp
//! 2. Synthetic random walks, seeded from the symbol name
//!
//! Synthetic data is a developer-only mode; loaded series are tagged with
//! their source so results on synthetic data can be told apart.

use chrono::DateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use confluence_core::domain::{validate_candles, Candle, CandleError, Timeframe};

/// Epoch values below this are taken to be seconds.
const SECONDS_CUTOFF: i64 = 100_000_000_000;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unparseable time '{value}'")]
    InvalidTime { row: usize, value: String },

    #[error("no candles in {0}")]
    Empty(String),

    #[error("candle data: {0}")]
    Candles(#[from] CandleError),
}

/// Where a series came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic { seed: u64 },
    Provider,
}

/// A candle series ready for analysis.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
    pub source: DataSource,
}

impl LoadedSeries {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    #[serde(alias = "timestamp", alias = "date", alias = "open_time")]
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

fn parse_time(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(epoch) = value.parse::<i64>() {
        return Some(if epoch.abs() < SECONDS_CUTOFF { epoch * 1_000 } else { epoch });
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.timestamp_millis())
}

/// Read candles from any CSV reader.
///
/// Rows are sorted by time; a repeated timestamp keeps the later row. The
/// result is validated before it is returned.
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    for (row, record) in rdr.deserialize::<CandleRow>().enumerate() {
        let record = record?;
        let time = parse_time(&record.time).ok_or_else(|| LoadError::InvalidTime {
            row: row + 1,
            value: record.time.clone(),
        })?;
        candles.push(Candle::new(
            time,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    candles.sort_by_key(|c| c.time);
    // dedup_by keeps the first of a run; reverse so the later row wins.
    candles.reverse();
    candles.dedup_by_key(|c| c.time);
    candles.reverse();

    validate_candles(&candles)?;
    Ok(candles)
}

/// Load a CSV file of candles.
pub fn load_csv(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let candles = read_candles(file)?;
    if candles.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    Ok(candles)
}

/// Deterministic seed from a symbol name.
pub fn symbol_seed(symbol: &str) -> u64 {
    let hash = blake3::hash(symbol.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Generate a synthetic random walk for testing and demos.
///
/// The walk alternates trending and ranging stretches so that swings,
/// breaks and zones all appear. These are clearly fake and tagged as such.
pub fn synthetic_candles(seed: u64, timeframe: Timeframe, count: usize, end_ms: i64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let step = timeframe.duration_ms();
    let start = end_ms - step * count.saturating_sub(1) as i64;

    let mut candles = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut drift = 0.0_f64;
    let mut remaining = 0usize;

    for i in 0..count {
        if remaining == 0 {
            remaining = rng.gen_range(15..60);
            drift = match rng.gen_range(0..3) {
                0 => rng.gen_range(0.001..0.004),
                1 => -rng.gen_range(0.001..0.004),
                _ => 0.0,
            };
        }
        remaining -= 1;

        let ret: f64 = drift + rng.gen_range(-0.008..0.008);
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004));
        let mut volume = rng.gen_range(500.0..1_500.0);
        if rng.gen_bool(0.05) {
            volume *= 3.0;
        }

        candles.push(Candle::new(start + i as i64 * step, open, high, low, close, volume));
        price = close;
    }
    candles
}

/// Synthetic series for `symbol`, seeded from its name.
pub fn synthetic_series(symbol: &str, timeframe: Timeframe, count: usize, end_ms: i64) -> LoadedSeries {
    let seed = symbol_seed(symbol);
    LoadedSeries {
        symbol: symbol.to_string(),
        timeframe,
        candles: synthetic_candles(seed, timeframe, count, end_ms),
        source: DataSource::Synthetic { seed },
    }
}

/// CSV series for `symbol`.
pub fn csv_series(symbol: &str, timeframe: Timeframe, path: &Path) -> Result<LoadedSeries, LoadError> {
    Ok(LoadedSeries {
        symbol: symbol.to_string(),
        timeframe,
        candles: load_csv(path)?,
        source: DataSource::Csv(path.to_path_buf()),
    })
}
