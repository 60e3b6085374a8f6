//! Tight sideways ranges.

use crate::domain::{Candle, Consolidation, Polarity};

/// Find maximal windows of at least `min_len` candles whose total high-low
/// range stays within `range_atr` ATRs.
///
/// Windows do not overlap: scanning resumes after the end of each one. The
/// first later close outside the range sets the breakout direction.
pub fn detect_consolidations(
    candles: &[Candle],
    atr: f64,
    min_len: usize,
    range_atr: f64,
) -> Vec<Consolidation> {
    let n = candles.len();
    if !atr.is_finite() || atr < 0.0 || min_len < 2 || n < min_len {
        return Vec::new();
    }
    let max_range = atr * range_atr;

    let mut out = Vec::new();
    let mut start = 0;
    while start + min_len <= n {
        let mut high = candles[start].high;
        let mut low = candles[start].low;
        let mut end = start;
        for (j, c) in candles.iter().enumerate().skip(start + 1) {
            let (h, l) = (high.max(c.high), low.min(c.low));
            if h - l > max_range {
                break;
            }
            high = h;
            low = l;
            end = j;
        }

        if end + 1 - start >= min_len {
            let breakout = candles[end + 1..].iter().enumerate().find_map(|(k, c)| {
                if c.close > high {
                    Some((Polarity::Bullish, end + 1 + k))
                } else if c.close < low {
                    Some((Polarity::Bearish, end + 1 + k))
                } else {
                    None
                }
            });
            out.push(Consolidation {
                start_index: start,
                end_index: end,
                high,
                low,
                breakout: breakout.map(|(p, _)| p),
                breakout_index: breakout.map(|(_, i)| i),
            });
            start = end + 1;
        } else {
            start += 1;
        }
    }
    out
}
