//! Volume averages, relative volume, and a coarse volume profile.

use super::Indicator;
use crate::domain::{Candle, VolumeNode};

/// Rolling mean of volume.
#[derive(Debug, Clone)]
pub struct VolumeSma {
    period: usize,
    name: String,
}

impl VolumeSma {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("volume_sma_{period}"),
        }
    }
}

impl Indicator for VolumeSma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }
        let mut sum: f64 = candles[..self.period].iter().map(|c| c.volume).sum();
        result[self.period - 1] = sum / self.period as f64;
        for i in self.period..n {
            sum += candles[i].volume - candles[i - self.period].volume;
            result[i] = sum / self.period as f64;
        }
        result
    }
}

/// Last candle volume divided by the mean of the preceding `period` volumes.
///
/// Returns 1.0 (neutral) when there is no history or the average is zero.
pub fn relative_volume(candles: &[Candle], period: usize) -> f64 {
    let n = candles.len();
    if n < 2 || period == 0 {
        return 1.0;
    }
    let start = n.saturating_sub(period + 1);
    let history = &candles[start..n - 1];
    let avg = VolumeSma::new(history.len())
        .compute(history)
        .last()
        .copied()
        .unwrap_or(f64::NAN);
    if avg <= 0.0 || !avg.is_finite() {
        return 1.0;
    }
    let rel = candles[n - 1].volume / avg;
    if rel.is_finite() {
        rel
    } else {
        1.0
    }
}

/// High-volume nodes of the last `window` candles.
///
/// Typical prices are binned into `bins` equal buckets over the window's range;
/// buckets holding at least `node_ratio` times the mean bucket volume become nodes.
/// A zero-range window collapses to a single node when it traded any volume.
pub fn volume_nodes(candles: &[Candle], window: usize, bins: usize, node_ratio: f64) -> Vec<VolumeNode> {
    if candles.is_empty() || bins == 0 || window == 0 {
        return Vec::new();
    }
    let slice = &candles[candles.len().saturating_sub(window)..];
    let hi = slice.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lo = slice.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let total: f64 = slice.iter().map(|c| c.volume).sum();
    if total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }

    let range = hi - lo;
    if range <= 0.0 {
        return vec![VolumeNode {
            price: hi,
            volume: total,
            half_width: 0.0,
        }];
    }

    let width = range / bins as f64;
    let mut buckets = vec![0.0_f64; bins];
    for c in slice {
        let typical = (c.high + c.low + c.close) / 3.0;
        let b = (((typical - lo) / width) as usize).min(bins - 1);
        buckets[b] += c.volume;
    }

    let mean = total / bins as f64;
    buckets
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= mean * node_ratio)
        .map(|(b, &volume)| VolumeNode {
            price: lo + width * (b as f64 + 0.5),
            volume,
            half_width: width / 2.0,
        })
        .collect()
}
