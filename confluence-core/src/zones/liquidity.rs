//! Liquidity pools: clustered swing highs (buy-side) and lows (sell-side).

use crate::config::ZoneConfig;
use crate::domain::{Candle, LiquidityPool, PoolSide, SwingKind, SwingPoint};

const BASE_STRENGTH: f64 = 30.0;
const TOUCH_STRENGTH: f64 = 20.0;
const EQUAL_STRENGTH: f64 = 20.0;

/// Swings within this distance of each other belong to the same pool.
pub fn pool_tolerance(atr: f64, price: f64, atr_multiple: f64) -> f64 {
    let by_atr = if atr.is_finite() { atr * atr_multiple } else { 0.0 };
    by_atr.max(price.abs() * 1e-4)
}

struct Cluster {
    anchor: f64,
    extreme: f64,
    touches: usize,
    first: usize,
    last: usize,
}

/// Detect pools on both sides and resolve their sweeps.
///
/// Clusters with two or more touches are equal highs/lows. Single-touch
/// swings only survive as stop pools when they are among the most recent
/// `stop_pools_per_side` that no later candle has closed beyond.
pub fn detect_liquidity_pools(
    candles: &[Candle],
    swings: &[SwingPoint],
    atr: f64,
    config: &ZoneConfig,
) -> Vec<LiquidityPool> {
    let Some(last) = candles.last() else {
        return Vec::new();
    };
    let tolerance = pool_tolerance(atr, last.close, config.equal_tolerance_atr);

    let mut pools = Vec::new();
    for side in [PoolSide::BuySide, PoolSide::SellSide] {
        pools.extend(side_pools(candles, swings, side, tolerance, config.stop_pools_per_side));
    }
    refresh_sweeps(&mut pools, candles);
    pools
}

fn side_pools(
    candles: &[Candle],
    swings: &[SwingPoint],
    side: PoolSide,
    tolerance: f64,
    stop_pools: usize,
) -> Vec<LiquidityPool> {
    let kind = match side {
        PoolSide::BuySide => SwingKind::High,
        PoolSide::SellSide => SwingKind::Low,
    };

    let mut clusters: Vec<Cluster> = Vec::new();
    for s in swings.iter().filter(|s| s.kind == kind) {
        match clusters
            .iter_mut()
            .find(|c| (c.anchor - s.price).abs() <= tolerance)
        {
            Some(c) => {
                c.touches += 1;
                c.last = s.index;
                c.extreme = match side {
                    PoolSide::BuySide => c.extreme.max(s.price),
                    PoolSide::SellSide => c.extreme.min(s.price),
                };
            }
            None => clusters.push(Cluster {
                anchor: s.price,
                extreme: s.price,
                touches: 1,
                first: s.index,
                last: s.index,
            }),
        }
    }

    let last_index = candles.len().saturating_sub(1);
    let closed_beyond = |c: &Cluster| {
        candles.get(c.last + 1..).unwrap_or(&[]).iter().any(|k| match side {
            PoolSide::BuySide => k.close > c.extreme,
            PoolSide::SellSide => k.close < c.extreme,
        })
    };

    let mut singles: Vec<&Cluster> = clusters
        .iter()
        .filter(|c| c.touches == 1 && !closed_beyond(c))
        .collect();
    singles.sort_by_key(|c| std::cmp::Reverse(c.last));
    singles.truncate(stop_pools);

    clusters
        .iter()
        .filter(|c| c.touches >= 2)
        .chain(singles)
        .map(|c| {
            let is_equal = c.touches >= 2;
            let mut strength = BASE_STRENGTH + TOUCH_STRENGTH * (c.touches - 1) as f64;
            if is_equal {
                strength += EQUAL_STRENGTH;
            }
            LiquidityPool {
                price: c.extreme,
                side,
                strength: strength.min(100.0),
                is_equal,
                touches: c.touches,
                first_touch_index: c.first,
                last_touch_index: c.last,
                age: last_index.saturating_sub(c.last),
                swept: false,
                swept_index: None,
            }
        })
        .collect()
}

/// Apply the sweep rule to every unswept pool.
///
/// Sell-side: `low < p && close > p` with the previous low above `p`.
/// Buy-side: `high > p && close < p` with the previous high below `p`.
/// A swept pool never reverts.
pub fn refresh_sweeps(pools: &mut [LiquidityPool], candles: &[Candle]) {
    for pool in pools.iter_mut().filter(|p| !p.swept) {
        let p = pool.price;
        let start = (pool.last_touch_index + 1).max(1);
        let swept_at = (start..candles.len()).find(|&j| {
            let (c, prev) = (&candles[j], &candles[j - 1]);
            match pool.side {
                PoolSide::SellSide => c.low < p && c.close > p && prev.low > p,
                PoolSide::BuySide => c.high > p && c.close < p && prev.high < p,
            }
        });
        if let Some(j) = swept_at {
            pool.mark_swept(j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(i as i64 * 60_000, open, high, low, close, 100.0)
    }

    fn swing(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            index,
            time: index as i64 * 60_000,
            price,
            kind,
        }
    }

    /// Gentle candles around 105 that never reach 100 or 110.
    fn quiet(n: usize) -> Vec<Candle> {
        (0..n).map(|i| candle(i, 105.0, 106.0, 104.0, 105.0)).collect()
    }

    #[test]
    fn equal_lows_form_one_pool() {
        let candles = quiet(20);
        let swings = vec![
            swing(3, 100.0, SwingKind::Low),
            swing(9, 100.05, SwingKind::Low),
            swing(6, 110.0, SwingKind::High),
        ];
        let pools = detect_liquidity_pools(&candles, &swings, 1.0, &ZoneConfig::default());
        let sell: Vec<_> = pools.iter().filter(|p| p.side == PoolSide::SellSide).collect();
        assert_eq!(sell.len(), 1);
        assert!(sell[0].is_equal);
        assert_eq!(sell[0].touches, 2);
        assert_eq!(sell[0].price, 100.0);
        assert_eq!(sell[0].strength, 70.0);
        assert_eq!(sell[0].age, 10);

        let buy: Vec<_> = pools.iter().filter(|p| p.side == PoolSide::BuySide).collect();
        assert_eq!(buy.len(), 1);
        assert!(!buy[0].is_equal);
        assert_eq!(buy[0].strength, 30.0);
    }

    #[test]
    fn sell_side_sweep_rule() {
        let mut candles = quiet(12);
        // Wick below 100 and close back above, previous low above 100.
        candles[10] = candle(10, 104.0, 104.5, 99.0, 102.0);
        let swings = vec![swing(2, 100.0, SwingKind::Low)];
        let pools = detect_liquidity_pools(&candles, &swings, 1.0, &ZoneConfig::default());
        assert_eq!(pools.len(), 1);
        assert!(pools[0].swept);
        assert_eq!(pools[0].swept_index, Some(10));
    }

    #[test]
    fn close_through_is_not_a_sweep() {
        let mut candles = quiet(12);
        candles[10] = candle(10, 104.0, 104.5, 98.0, 99.0);
        let mut pools = vec![LiquidityPool {
            price: 100.0,
            side: PoolSide::SellSide,
            strength: 30.0,
            is_equal: false,
            touches: 1,
            first_touch_index: 2,
            last_touch_index: 2,
            age: 9,
            swept: false,
            swept_index: None,
        }];
        refresh_sweeps(&mut pools, &candles);
        assert!(!pools[0].swept);
    }

    #[test]
    fn swept_never_reverts() {
        let mut candles = quiet(14);
        candles[6] = candle(6, 108.0, 111.0, 107.0, 108.0);
        let mut pools = vec![LiquidityPool {
            price: 110.0,
            side: PoolSide::BuySide,
            strength: 30.0,
            is_equal: false,
            touches: 1,
            first_touch_index: 2,
            last_touch_index: 2,
            age: 11,
            swept: false,
            swept_index: None,
        }];
        refresh_sweeps(&mut pools, &candles);
        assert_eq!(pools[0].swept_index, Some(6));

        // A later, calmer buffer does not unset the flag.
        refresh_sweeps(&mut pools, &quiet(14));
        assert!(pools[0].swept);
        assert_eq!(pools[0].swept_index, Some(6));
    }

    #[test]
    fn broken_single_swing_is_not_a_stop_pool() {
        let mut candles = quiet(12);
        candles[8] = candle(8, 105.0, 112.0, 104.0, 111.0);
        let swings = vec![swing(2, 110.0, SwingKind::High)];
        let pools = detect_liquidity_pools(&candles, &swings, 1.0, &ZoneConfig::default());
        assert!(pools.is_empty());
    }

    #[test]
    fn stop_pools_are_capped_to_most_recent() {
        let candles = quiet(40);
        let swings: Vec<_> = (0..6)
            .map(|k| swing(2 + k * 5, 110.0 + k as f64 * 2.0, SwingKind::High))
            .collect();
        let pools = detect_liquidity_pools(&candles, &swings, 1.0, &ZoneConfig::default());
        assert_eq!(pools.len(), 3);
        assert!(pools.iter().all(|p| p.last_touch_index >= 17));
    }

    #[test]
    fn tolerance_has_price_floor() {
        assert!((pool_tolerance(0.0, 50_000.0, 0.15) - 5.0).abs() < 1e-9);
        assert!((pool_tolerance(100.0, 50_000.0, 0.15) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs() {
        assert!(detect_liquidity_pools(&[], &[], 1.0, &ZoneConfig::default()).is_empty());
    }
}
