//! Fractal swing extraction.
//!
//! A HIGH swing at `i` has `w` candles on both sides and a high that is the
//! window maximum. Plateaus resolve to their leftmost candle: the pivot must
//! be strictly above everything to its left and not below anything to its
//! right. A flat buffer therefore has no swings.

use crate::domain::{Candle, SwingKind, SwingPoint};

/// Extract swing highs and lows with lookback `w`.
///
/// Returns an empty vector for `w == 0` or fewer than `2w + 1` candles. When a
/// single candle is both a high and a low pivot, the high is emitted first.
pub fn find_swings(candles: &[Candle], w: usize) -> Vec<SwingPoint> {
    let n = candles.len();
    if w == 0 || n < 2 * w + 1 {
        return Vec::new();
    }

    let mut swings = Vec::new();
    for i in w..n - w {
        let c = &candles[i];
        let left = &candles[i - w..i];
        let right = &candles[i + 1..=i + w];

        if c.high.is_finite()
            && left.iter().all(|l| c.high > l.high)
            && right.iter().all(|r| c.high >= r.high)
        {
            swings.push(SwingPoint {
                index: i,
                time: c.time,
                price: c.high,
                kind: SwingKind::High,
            });
        }

        if c.low.is_finite()
            && left.iter().all(|l| c.low < l.low)
            && right.iter().all(|r| c.low <= r.low)
        {
            swings.push(SwingPoint {
                index: i,
                time: c.time,
                price: c.low,
                kind: SwingKind::Low,
            });
        }
    }
    swings
}

/// Merge adjacent same-kind swings closer than `min_move_pct` percent.
///
/// Only neighbours in the combined sequence are compared. The merged swing
/// keeps the more extreme price (higher high, lower low) along with that
/// swing's index and time.
pub fn filter_significant_swings(swings: &[SwingPoint], min_move_pct: f64) -> Vec<SwingPoint> {
    let mut out: Vec<SwingPoint> = Vec::with_capacity(swings.len());
    for &swing in swings {
        match out.last_mut() {
            Some(last) if last.kind == swing.kind && last.price > 0.0 => {
                let move_pct = (swing.price - last.price).abs() / last.price * 100.0;
                if move_pct < min_move_pct {
                    let more_extreme = match swing.kind {
                        SwingKind::High => swing.price > last.price,
                        SwingKind::Low => swing.price < last.price,
                    };
                    if more_extreme {
                        *last = swing;
                    }
                    continue;
                }
                out.push(swing);
            }
            _ => out.push(swing),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn flat(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle::new(i as i64 * 60_000, 100.0, 100.0, 100.0, 100.0, 10.0))
            .collect()
    }

    #[test]
    fn short_input_yields_nothing() {
        assert!(find_swings(&make_candles(&[1.0, 2.0, 3.0, 2.0]), 2).is_empty());
        assert!(find_swings(&[], 3).is_empty());
        assert!(find_swings(&make_candles(&[1.0, 2.0, 1.0]), 0).is_empty());
    }

    #[test]
    fn flat_buffer_has_no_swings() {
        assert!(find_swings(&flat(50), 3).is_empty());
    }

    #[test]
    fn single_peak_and_trough() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 15.0, 12.0, 11.0, 10.0, 8.0, 10.0, 11.0]);
        let swings = find_swings(&candles, 2);
        let highs: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
        let lows: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::Low).collect();
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 3);
        assert_eq!(highs[0].price, 16.0);
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].index, 7);
        assert_eq!(lows[0].price, 7.0);
    }

    #[test]
    fn plateau_resolves_to_leftmost() {
        let mut candles = flat(9);
        for (i, c) in candles.iter_mut().enumerate() {
            c.high = match i {
                4 | 5 => 105.0,
                _ => 101.0,
            };
            c.open = 100.5;
            c.close = 100.5;
        }
        let highs: Vec<_> = find_swings(&candles, 2)
            .into_iter()
            .filter(|s| s.kind == SwingKind::High)
            .collect();
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 4);
    }

    #[test]
    fn merge_keeps_more_extreme() {
        let swings = vec![
            SwingPoint { index: 2, time: 2, price: 100.0, kind: SwingKind::High },
            SwingPoint { index: 6, time: 6, price: 100.05, kind: SwingKind::High },
            SwingPoint { index: 9, time: 9, price: 95.0, kind: SwingKind::Low },
            SwingPoint { index: 12, time: 12, price: 103.0, kind: SwingKind::High },
        ];
        let filtered = filter_significant_swings(&swings, 0.15);
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[0].index, 6);
        assert_eq!(filtered[0].price, 100.05);
        assert_eq!(filtered[1].kind, SwingKind::Low);
    }

    #[test]
    fn merge_ignores_distant_swings() {
        let swings = vec![
            SwingPoint { index: 2, time: 2, price: 90.0, kind: SwingKind::Low },
            SwingPoint { index: 6, time: 6, price: 95.0, kind: SwingKind::Low },
        ];
        assert_eq!(filter_significant_swings(&swings, 0.15).len(), 2);
    }
}
