//! Momentum scalp on a high-volume displacement candle.

use super::{liquidity_targets, SetupStrategy};
use crate::domain::{Candle, Direction, EntryZone, StrategyKind, TradeSetup};
use crate::engine::MarketState;

/// ATR multiples for the fallback targets when no liquidity lies ahead.
const FALLBACK_TARGETS_ATR: [f64; 2] = [1.0, 2.0];
/// Pullback depth of the entry zone, in ATR.
const PULLBACK_ATR: f64 = 0.25;
const WICK_BUFFER_ATR: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct ScalpStrategy {
    pub min_relative_volume: f64,
    pub min_body_atr: f64,
}

impl Default for ScalpStrategy {
    fn default() -> Self {
        Self {
            min_relative_volume: 1.5,
            min_body_atr: 0.5,
        }
    }
}

impl SetupStrategy for ScalpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scalp
    }

    fn generate(&self, candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        let Some(last) = candles.last() else {
            return Vec::new();
        };
        if state.atr <= 0.0
            || !state.timeframe.is_intraday()
            || state.relative_volume < self.min_relative_volume
            || last.body() < self.min_body_atr * state.atr
        {
            return Vec::new();
        }

        let direction = if last.is_bullish() {
            Direction::Long
        } else if last.is_bearish() {
            Direction::Short
        } else {
            return Vec::new();
        };
        let s = direction.sign();
        // Never scalp against the trend.
        if state.trend().sign() * s < 0.0 {
            return Vec::new();
        }

        let optimal = last.close - s * PULLBACK_ATR * state.atr / 2.0;
        let zone = EntryZone::new(last.close, last.close - s * PULLBACK_ATR * state.atr, optimal);
        let wick = match direction {
            Direction::Long => last.low,
            Direction::Short => last.high,
        };
        let stop = wick - s * WICK_BUFFER_ATR * state.atr;

        let mut targets = liquidity_targets(state, direction, optimal);
        if targets.is_empty() {
            targets = FALLBACK_TARGETS_ATR
                .iter()
                .map(|m| optimal + s * m * state.atr)
                .collect();
        }
        vec![TradeSetup::candidate(direction, self.kind(), zone, stop, last.time)
            .with_targets(targets)
            .with_reason(format!(
                "{:.1}x volume displacement candle ({:.1} ATR body)",
                state.relative_volume,
                last.body() / state.atr
            ))]
    }
}
