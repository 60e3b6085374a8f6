//! Order block retest.

use super::{liquidity_targets, stop_beyond, SetupStrategy};
use crate::domain::{Candle, Direction, EntryZone, OrderBlock, StrategyKind, TradeSetup};
use crate::engine::MarketState;

/// Long off the nearest unbroken bullish block below price; short mirrored.
#[derive(Debug, Clone)]
pub struct OrderBlockStrategy {
    /// Blocks further than this from price (in ATR) are ignored.
    pub max_distance_atr: f64,
}

impl OrderBlockStrategy {
    pub fn new(max_distance_atr: f64) -> Self {
        Self { max_distance_atr }
    }

    fn nearest<'a>(&self, state: &'a MarketState, direction: Direction) -> Option<&'a OrderBlock> {
        let price = state.current_price;
        state
            .zones
            .order_blocks
            .iter()
            .filter(|ob| !ob.is_breaker() && ob.polarity == direction.polarity())
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
            .map(|(ob, _)| ob)
    }
}

impl SetupStrategy for OrderBlockStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OrderBlock
    }

    fn generate(&self, _candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        if state.atr <= 0.0 {
            return Vec::new();
        }
        [Direction::Long, Direction::Short]
            .into_iter()
            .filter_map(|direction| {
                let ob = self.nearest(state, direction)?;
                let zone = EntryZone::new(ob.bottom, ob.top, ob.midpoint());
                let invalidation = match direction {
                    Direction::Long => ob.bottom,
                    Direction::Short => ob.top,
                };
                let stop = stop_beyond(invalidation, direction, state.atr);
                let targets = liquidity_targets(state, direction, zone.optimal);
                Some(
                    TradeSetup::candidate(direction, self.kind(), zone, stop, state.last_time)
                        .with_targets(targets)
                        .with_reason(format!(
                            "{} order block at candle {} ({:.1} ATR displacement)",
                            ob.polarity,
                            ob.index,
                            ob.displacement_atr
                        )),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderBlockKind, Polarity};
    use crate::setups::test_support::{quiet, state_for};

    fn block(bottom: f64, top: f64, polarity: Polarity, index: usize) -> OrderBlock {
        OrderBlock {
            top,
            bottom,
            polarity,
            origin: polarity,
            index,
            displacement_atr: 2.0,
            mitigated: false,
            broken_index: None,
            kind: OrderBlockKind::OrderBlock,
        }
    }

    #[test]
    fn picks_nearest_bullish_block_below_price() {
        let candles = quiet(30, 100.0);
        let mut state = state_for(&candles);
        state.atr = 1.0;
        state.current_price = 100.0;
        state.zones.order_blocks = vec![
            block(94.0, 95.0, Polarity::Bullish, 3),
            block(97.0, 98.0, Polarity::Bullish, 8),
            block(90.0, 91.0, Polarity::Bullish, 12),
        ];
        let setups = OrderBlockStrategy::new(6.0).generate(&candles, &state);
        assert_eq!(setups.len(), 1);
        let s = &setups[0];
        assert_eq!(s.direction, Direction::Long);
        assert_eq!(s.entry_zone.bottom, 97.0);
        assert_eq!(s.entry_zone.top, 98.0);
        assert_eq!(s.entry_zone.optimal, 97.5);
        assert_eq!(s.stop_loss, 96.75);
        assert!(s.rationale[0].contains("candle 8"));
    }

    #[test]
    fn ignores_blocks_out_of_range_and_breakers() {
        let candles = quiet(30, 100.0);
        let mut state = state_for(&candles);
        state.atr = 1.0;
        state.current_price = 100.0;
        let mut breaker = block(103.0, 104.0, Polarity::Bearish, 5);
        breaker.kind = OrderBlockKind::Breaker;
        state.zones.order_blocks = vec![block(80.0, 81.0, Polarity::Bullish, 2), breaker];
        assert!(OrderBlockStrategy::new(6.0).generate(&candles, &state).is_empty());
    }

    #[test]
    fn bearish_block_above_gives_short() {
        let candles = quiet(30, 100.0);
        let mut state = state_for(&candles);
        state.atr = 1.0;
        state.current_price = 100.0;
        state.zones.order_blocks = vec![block(102.0, 103.0, Polarity::Bearish, 9)];
        let setups = OrderBlockStrategy::new(6.0).generate(&candles, &state);
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].direction, Direction::Short);
        assert_eq!(setups[0].stop_loss, 103.25);
    }
}
