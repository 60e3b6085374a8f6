//! Candle, the fundamental market data unit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV candle for a single instrument.
///
/// `time` is the candle open time in epoch milliseconds. A candle buffer is
/// ordered by strictly increasing `time` and is only ever borrowed by the
/// analysis stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Problems found while validating a candle buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("candle {index} has non-finite or inconsistent OHLCV values")]
    Corrupted { index: usize },
    #[error("candle {index} time {time} is not after previous time {previous}")]
    NonMonotonicTime { index: usize, time: i64, previous: i64 },
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: high >= low, high bounds open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Validate ordering and sanity of a whole buffer.
///
/// Returns the first problem found, scanning from the oldest candle.
pub fn validate_candles(candles: &[Candle]) -> Result<(), CandleError> {
    for (index, candle) in candles.iter().enumerate() {
        if !candle.is_sane() {
            return Err(CandleError::Corrupted { index });
        }
        if index > 0 {
            let previous = candles[index - 1].time;
            if candle.time <= previous {
                return Err(CandleError::NonMonotonicTime {
                    index,
                    time: candle.time,
                    previous,
                });
            }
        }
    }
    Ok(())
}

/// Mean close over a slice, 0.0 when empty.
pub fn mean_close(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    candles.iter().map(|c| c.close).sum::<f64>() / candles.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle() -> Candle {
        Candle::new(1_700_000_000_000, 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
        assert!(sample_candle().is_bullish());
    }

    #[test]
    fn candle_detects_void() {
        let mut c = sample_candle();
        c.open = f64::NAN;
        assert!(c.is_void());
        assert!(!c.is_sane());

        let mut c = sample_candle();
        c.volume = f64::INFINITY;
        assert!(c.is_void());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut c = sample_candle();
        c.high = 97.0; // below low
        assert!(!c.is_sane());
    }

    #[test]
    fn validate_rejects_unordered_time() {
        let a = sample_candle();
        let mut b = sample_candle();
        b.time = a.time;
        let err = validate_candles(&[a, b]).unwrap_err();
        assert!(matches!(err, CandleError::NonMonotonicTime { index: 1, .. }));
    }

    #[test]
    fn validate_reports_corrupted_index() {
        let a = sample_candle();
        let mut b = sample_candle();
        b.time += 60_000;
        b.close = -1.0;
        assert_eq!(
            validate_candles(&[a, b]),
            Err(CandleError::Corrupted { index: 1 })
        );
    }

    #[test]
    fn mean_close_of_empty_is_zero() {
        assert_eq!(mean_close(&[]), 0.0);
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let c = sample_candle();
        let json = serde_json::to_string(&c).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(c, deser);
    }
}
