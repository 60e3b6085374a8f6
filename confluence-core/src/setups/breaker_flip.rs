//! Breaker retest: a failed order block traded from its flipped side.

use super::{liquidity_targets, stop_beyond, SetupStrategy};
use crate::domain::{Candle, Direction, EntryZone, StrategyKind, TradeSetup};
use crate::engine::MarketState;

#[derive(Debug, Clone)]
pub struct BreakerFlipStrategy {
    pub max_distance_atr: f64,
}

impl BreakerFlipStrategy {
    pub fn new(max_distance_atr: f64) -> Self {
        Self { max_distance_atr }
    }
}

impl SetupStrategy for BreakerFlipStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BreakerFlip
    }

    fn generate(&self, _candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        if state.atr <= 0.0 {
            return Vec::new();
        }
        let price = state.current_price;

        [Direction::Long, Direction::Short]
            .into_iter()
            .filter_map(|direction| {
                // A bearish block broken upward now supports (long); mirrored for shorts.
                let breaker = state
                    .zones
                    .order_blocks
                    .iter()
                    .filter(|ob| ob.is_breaker() && ob.polarity == direction.polarity())
                    .filter(|ob| match direction {
                        Direction::Long => ob.bottom < price,
                        Direction::Short => ob.top > price,
                    })
                    .map(|ob| {
                        let edge = match direction {
                            Direction::Long => ob.top.min(price),
                            Direction::Short => ob.bottom.max(price),
                        };
                        (ob, state.distance_atr(edge))
                    })
                    .filter(|(_, d)| *d <= self.max_distance_atr)
                    .min_by(|(a, da), (b, db)| da.total_cmp(db).then(b.index.cmp(&a.index)))
                    .map(|(ob, _)| ob)?;

                let zone = EntryZone::new(breaker.bottom, breaker.top, breaker.midpoint());
                let invalidation = match direction {
                    Direction::Long => breaker.bottom,
                    Direction::Short => breaker.top,
                };
                let stop = stop_beyond(invalidation, direction, state.atr);
                let targets = liquidity_targets(state, direction, zone.optimal);
                let broken = breaker
                    .broken_index
                    .map_or_else(|| "?".to_string(), |i| i.to_string());
                Some(
                    TradeSetup::candidate(direction, self.kind(), zone, stop, state.last_time)
                        .with_targets(targets)
                        .with_reason(format!(
                            "{} block from candle {} flipped {} at candle {}",
                            breaker.origin, breaker.index, breaker.polarity, broken
                        )),
                )
            })
            .collect()
    }
}
