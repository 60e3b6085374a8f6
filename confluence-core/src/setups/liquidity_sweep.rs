//! Liquidity sweep reversal.
//!
//! A sell-side sweep (wick below a pool, close back above) is a long trigger;
//! a buy-side sweep is a short trigger. Only sweeps within `recency` candles
//! that price has not since given up count.

use super::{liquidity_targets, SetupStrategy};
use crate::domain::{Candle, Direction, EntryZone, PoolSide, StrategyKind, TradeSetup};
use crate::engine::MarketState;

/// Stop distance beyond the sweep wick, in ATR.
const WICK_BUFFER_ATR: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct LiquiditySweepStrategy {
    pub recency: usize,
}

impl LiquiditySweepStrategy {
    pub fn new(recency: usize) -> Self {
        Self { recency }
    }
}

impl Default for LiquiditySweepStrategy {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SetupStrategy for LiquiditySweepStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LiquiditySweep
    }

    fn generate(&self, candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        if state.atr <= 0.0 {
            return Vec::new();
        }
        let since = state.recent_since(self.recency);

        [(Direction::Long, PoolSide::SellSide), (Direction::Short, PoolSide::BuySide)]
            .into_iter()
            .filter_map(|(direction, swept_side)| {
                let pool = state.zones.recent_sweep(swept_side, since)?;
                let sweep = candles.get(pool.swept_index?)?;
                let s = direction.sign();
                // Price back beyond the pool means the sweep already failed.
                if (state.current_price - pool.price) * s <= 0.0 {
                    return None;
                }
                let wick = match direction {
                    Direction::Long => sweep.low,
                    Direction::Short => sweep.high,
                };
                let zone = EntryZone::new(pool.price, sweep.close, (pool.price + sweep.close) / 2.0);
                let stop = wick - s * WICK_BUFFER_ATR * state.atr;
                let targets = liquidity_targets(state, direction, zone.optimal);
                let label = if pool.is_equal { "equal" } else { "swing" };
                Some(
                    TradeSetup::candidate(direction, self.kind(), zone, stop, sweep.time)
                        .with_targets(targets)
                        .with_reason(format!(
                            "swept {} {} liquidity at {:.4}",
                            label,
                            match swept_side {
                                PoolSide::BuySide => "buy-side",
                                PoolSide::SellSide => "sell-side",
                            },
                            pool.price
                        )),
                )
            })
            .collect()
    }
}
