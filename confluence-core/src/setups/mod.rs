//! Setup generation.
//!
//! Each strategy reads the finished [`MarketState`] and proposes at most one
//! candidate per direction. Strategies never re-derive zones; they only pick
//! from what the detectors produced. Invariant corrections are applied
//! afterwards by [`enforce_invariants`], identically for every strategy.

pub mod breaker_flip;
pub mod corrections;
pub mod factory;
pub mod liquidity_sweep;
pub mod order_block;
pub mod scalp;
pub mod wyckoff;

pub use breaker_flip::BreakerFlipStrategy;
pub use corrections::enforce_invariants;
pub use factory::{create_strategy, parse_strategy, FactoryError, StrategyRegistry};
pub use liquidity_sweep::LiquiditySweepStrategy;
pub use order_block::OrderBlockStrategy;
pub use scalp::ScalpStrategy;
pub use wyckoff::WyckoffStrategy;

use crate::domain::{Candle, Direction, PoolSide, StrategyKind, TradeSetup};
use crate::engine::MarketState;

/// Targets proposed per candidate.
pub const MAX_TARGETS: usize = 3;
/// Stop distance beyond a zone, in ATR.
pub const STOP_BUFFER_ATR: f64 = 0.25;

/// Trait for setup strategies.
///
/// Implementations are stateless and must only read `candles` and `state`.
pub trait SetupStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Propose zero or one candidate per direction.
    fn generate(&self, candles: &[Candle], state: &MarketState) -> Vec<TradeSetup>;
}

/// Liquidity and imbalance levels beyond `entry` in `direction`, nearest first.
///
/// Sources: unswept pools on the target side, the primary obligation when it
/// points the same way, and unmitigated imbalances price would have to fill.
pub fn liquidity_targets(state: &MarketState, direction: Direction, entry: f64) -> Vec<f64> {
    let sign = direction.sign();
    let target_side = match direction {
        Direction::Long => PoolSide::BuySide,
        Direction::Short => PoolSide::SellSide,
    };

    let mut levels: Vec<f64> = state
        .zones
        .unswept_pools(target_side)
        .map(|p| p.price)
        .collect();
    if let Some(primary) = state.obligations.primary {
        if primary.direction == direction.polarity() {
            levels.push(primary.price);
        }
    }
    levels.extend(
        state
            .zones
            .unmitigated_imbalances()
            .filter(|g| g.kind != direction.polarity())
            .map(|g| match direction {
                Direction::Long => g.bottom,
                Direction::Short => g.top,
            }),
    );

    levels.retain(|&p| p.is_finite() && (p - entry) * sign > 0.0);
    levels.sort_by(|a, b| ((a - entry) * sign).total_cmp(&((b - entry) * sign)));
    let min_gap = state.atr * 0.1;
    levels.dedup_by(|b, a| (*b - *a).abs() <= min_gap);
    levels.truncate(MAX_TARGETS);
    levels
}

/// Protective stop `STOP_BUFFER_ATR` beyond `level`, against `direction`.
pub fn stop_beyond(level: f64, direction: Direction, atr: f64) -> f64 {
    level - direction.sign() * STOP_BUFFER_ATR * atr
}
