//! Strategy construction and the per-analyzer strategy registry.

use tracing::trace;

use super::{
    BreakerFlipStrategy, LiquiditySweepStrategy, OrderBlockStrategy, ScalpStrategy, SetupStrategy,
    WyckoffStrategy,
};
use crate::config::AnalysisConfig;
use crate::domain::{Candle, StrategyKind, TradeSetup};
use crate::engine::MarketState;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
}

// ─── Factory ─────────────────────────────────────────────────────────

/// Resolve a strategy by its snake_case name.
pub fn parse_strategy(name: &str) -> Result<StrategyKind, FactoryError> {
    let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
    StrategyKind::ALL
        .into_iter()
        .find(|k| k.name() == normalized)
        .ok_or_else(|| FactoryError::UnknownStrategy(name.to_string()))
}

/// Create a strategy with parameters drawn from the analysis config.
pub fn create_strategy(kind: StrategyKind, config: &AnalysisConfig) -> Box<dyn SetupStrategy> {
    let max_distance = config.scoring.max_entry_distance_atr;
    match kind {
        StrategyKind::OrderBlock => Box::new(OrderBlockStrategy::new(max_distance)),
        StrategyKind::LiquiditySweep => Box::new(LiquiditySweepStrategy::default()),
        StrategyKind::Wyckoff => Box::new(WyckoffStrategy::default()),
        StrategyKind::BreakerFlip => Box::new(BreakerFlipStrategy::new(max_distance)),
        StrategyKind::Scalp => Box::new(ScalpStrategy::default()),
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// The enabled strategies, in configuration order.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn SetupStrategy>>,
}

impl StrategyRegistry {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut kinds = config.strategies.clone();
        kinds.sort();
        kinds.dedup();
        Self {
            strategies: kinds.into_iter().map(|k| create_strategy(k, config)).collect(),
        }
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Raw candidates from every strategy, uncorrected and unscored.
    pub fn generate(&self, candles: &[Candle], state: &MarketState) -> Vec<TradeSetup> {
        self.strategies
            .iter()
            .flat_map(|strategy| {
                let setups = strategy.generate(candles, state);
                trace!(strategy = %strategy.kind(), count = setups.len(), "strategy candidates");
                setups
            })
            .collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_names_and_dashes() {
        assert_eq!(parse_strategy("order_block").unwrap(), StrategyKind::OrderBlock);
        assert_eq!(parse_strategy("Liquidity-Sweep").unwrap(), StrategyKind::LiquiditySweep);
        assert!(matches!(
            parse_strategy("martingale"),
            Err(FactoryError::UnknownStrategy(name)) if name == "martingale"
        ));
    }

    #[test]
    fn factory_kind_matches_request() {
        let config = AnalysisConfig::default();
        for kind in StrategyKind::ALL {
            assert_eq!(create_strategy(kind, &config).kind(), kind);
        }
    }

    #[test]
    fn registry_dedupes_configured_strategies() {
        let config = AnalysisConfig {
            strategies: vec![StrategyKind::Scalp, StrategyKind::OrderBlock, StrategyKind::Scalp],
            ..AnalysisConfig::default()
        };
        let registry = StrategyRegistry::from_config(&config);
        assert_eq!(registry.kinds(), vec![StrategyKind::OrderBlock, StrategyKind::Scalp]);
    }
}
