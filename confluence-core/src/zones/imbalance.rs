//! Fair value gaps and their 50% mitigation.

use crate::domain::{Candle, Imbalance, Polarity};

/// Detect three-candle gaps and resolve their mitigation.
///
/// Bullish when `c3.low > c1.high` (bounds `[c1.high, c3.low]`), bearish when
/// `c3.high < c1.low`. Gaps smaller than `min_gap_pct` percent of price are
/// ignored.
pub fn detect_imbalances(candles: &[Candle], min_gap_pct: f64) -> Vec<Imbalance> {
    let mut gaps = Vec::new();
    for i in 2..candles.len() {
        let (c1, c3) = (&candles[i - 2], &candles[i]);
        let (top, bottom, kind) = if c3.low > c1.high {
            (c3.low, c1.high, Polarity::Bullish)
        } else if c3.high < c1.low {
            (c1.low, c3.high, Polarity::Bearish)
        } else {
            continue;
        };
        if bottom > 0.0 && (top - bottom) / bottom * 100.0 < min_gap_pct {
            continue;
        }
        gaps.push(Imbalance {
            top,
            bottom,
            kind,
            index: i - 1,
            mitigated: false,
            mitigated_index: None,
        });
    }
    refresh_mitigation(&mut gaps, candles);
    gaps
}

/// Mark gaps whose midpoint was reached by a candle after the gap formed.
///
/// Bullish gaps mitigate on `low <= mid`, bearish on `high >= mid`. The
/// first touching candle is recorded; the flag never reverts.
pub fn refresh_mitigation(gaps: &mut [Imbalance], candles: &[Candle]) {
    for gap in gaps.iter_mut().filter(|g| !g.mitigated) {
        let mid = gap.midpoint();
        // The gap is complete at index + 1; revisits start after it.
        let touched = (gap.index + 2..candles.len()).find(|&j| match gap.kind {
            Polarity::Bullish => candles[j].low <= mid,
            Polarity::Bearish => candles[j].high >= mid,
        });
        if let Some(j) = touched {
            gap.mark_mitigated(j);
        }
    }
}
