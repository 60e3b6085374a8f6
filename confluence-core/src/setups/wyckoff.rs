//! Wyckoff accumulation / distribution.
//!
//! Two triggers off the most recent consolidation:
//! - a recent breakout, traded on a retest of the broken edge;
//! - a spring (wick below the range, close back inside) or upthrust
//!   (mirror) on one of the last few candles of an unbroken range.

use super::{liquidity_targets, stop_beyond, SetupStrategy};
use crate::domain::{Candle, Consolidation, Direction, EntryZone, Polarity, StrategyKind, TradeSetup};
use crate::engine::MarketState;

/// Share of the range height used as the retest entry zone.
const RETEST_DEPTH: f64 = 0.25;
/// Candles inspected for a spring or upthrust.
const SPRING_WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct WyckoffStrategy {
    /// Breakouts older than this many candles are ignored.
    pub recency: usize,
}

impl WyckoffStrategy {
    pub fn new(recency: usize) -> Self {
        Self { recency }
    }

    fn breakout(&self, range: &Consolidation, candles: &[Candle], state: &MarketState) -> Option<TradeSetup> {
        let polarity = range.breakout?;
        let index = range.breakout_index?;
        if index < state.recent_since(self.recency) {
            return None;
        }
        let direction = Direction::from_polarity(polarity);
        let edge = match direction {
            Direction::Long => range.high,
            Direction::Short => range.low,
        };
        // Back inside the range: the breakout failed.
        if (state.current_price - edge) * direction.sign() < 0.0 {
            return None;
        }
        let depth = RETEST_DEPTH * range.height();
        let inner = edge - direction.sign() * depth;
        let zone = EntryZone::new(edge, inner, (edge + inner) / 2.0);
        let stop = stop_beyond(range.midpoint(), direction, state.atr);
        let targets = liquidity_targets(state, direction, zone.optimal);
        let phase = match polarity {
            Polarity::Bullish => "accumulation",
            Polarity::Bearish => "distribution",
        };
        let time = candles.get(index).map_or(state.last_time, |c| c.time);
        Some(
            TradeSetup::candidate(direction, StrategyKind::Wyckoff, zone, stop, time)
                .with_targets(targets)
                .with_reason(format!(
                    "{phase} range {}..{} broken at candle {index}",
                    range.start_index, range.end_index
                )),
        )
    }

    fn spring(&self, range: &Consolidation, candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        if range.breakout.is_some() {
            return Vec::new();
        }
        let from = candles.len().saturating_sub(SPRING_WINDOW).max(range.start_index);
        let recent = candles.get(from..).unwrap_or(&[]);

        let mut setups = Vec::new();
        if let Some(c) = recent.iter().rev().find(|c| c.low < range.low && c.close > range.low) {
            let zone = EntryZone::new(range.low, c.close, (range.low + c.close) / 2.0);
            let stop = stop_beyond(c.low, Direction::Long, state.atr);
            setups.push(
                TradeSetup::candidate(Direction::Long, StrategyKind::Wyckoff, zone, stop, c.time)
                    .with_targets(liquidity_targets(state, Direction::Long, zone.optimal))
                    .with_reason(format!("spring below range low {:.4}", range.low)),
            );
        }
        if let Some(c) = recent.iter().rev().find(|c| c.high > range.high && c.close < range.high) {
            let zone = EntryZone::new(range.high, c.close, (range.high + c.close) / 2.0);
            let stop = stop_beyond(c.high, Direction::Short, state.atr);
            setups.push(
                TradeSetup::candidate(Direction::Short, StrategyKind::Wyckoff, zone, stop, c.time)
                    .with_targets(liquidity_targets(state, Direction::Short, zone.optimal))
                    .with_reason(format!("upthrust above range high {:.4}", range.high)),
            );
        }
        setups
    }
}

impl Default for WyckoffStrategy {
    fn default() -> Self {
        Self::new(20)
    }
}

impl SetupStrategy for WyckoffStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Wyckoff
    }

    fn generate(&self, candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        if state.atr <= 0.0 {
            return Vec::new();
        }
        let Some(range) = state.zones.consolidations.last() else {
            return Vec::new();
        };
        match self.breakout(range, candles, state) {
            Some(setup) => vec![setup],
            None => self.spring(range, candles, state),
        }
    }
}
