//! The per-run market state shared by the setup generator and scorer.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::{Bias, Candle, EnrichmentContext, Symbol, SwingPoint, Timeframe};
use crate::indicators::{latest_atr, relative_volume};
use crate::obligation::{evaluate_obligations, ObligationInput, ObligationReport};
use crate::probability::{compute_probabilities, Probabilities, ProbabilityInput};
use crate::regime::{detect_market_regime, RegimeReport};
use crate::structure::{filter_significant_swings, find_swings, label_structure, StructureAnalysis};
use crate::zones::ZoneSet;

/// Candles averaged for relative volume.
const RELATIVE_VOLUME_PERIOD: usize = 20;

/// Everything derived from one candle buffer, built once per analysis.
///
/// Stages after construction only read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub current_price: f64,
    pub atr: f64,
    pub last_index: usize,
    /// Open time (ms) of the last candle.
    pub last_time: i64,
    pub relative_volume: f64,
    pub htf_bias: Option<Bias>,
    pub order_book_imbalance: f64,
    pub swings: Vec<SwingPoint>,
    pub structure: StructureAnalysis,
    pub regime: RegimeReport,
    pub zones: ZoneSet,
    pub obligations: ObligationReport,
    pub probabilities: Probabilities,
}

impl MarketState {
    /// Run stages 1–6 over a validated, non-empty candle buffer.
    pub fn build(
        candles: &[Candle],
        symbol: &str,
        timeframe: Timeframe,
        context: &EnrichmentContext,
        config: &AnalysisConfig,
    ) -> Self {
        let last_index = candles.len().saturating_sub(1);
        let (current_price, last_time, last_move) = candles
            .last()
            .map_or((0.0, 0, 0.0), |c| (c.close, c.time, c.close - c.open));

        let lookback = config.swings.lookback_for(timeframe);
        let raw_swings = find_swings(candles, lookback);
        let swings = filter_significant_swings(&raw_swings, config.swings.min_move_pct);
        let structure = label_structure(candles, &swings);
        let regime = detect_market_regime(candles, &structure, &config.regime);
        let atr = latest_atr(candles, config.regime.atr_period);

        // Pools use the unfiltered pivots: nearly equal swings are the point.
        let zones = ZoneSet::detect(candles, &raw_swings, atr, &config.zones);

        let obligations = evaluate_obligations(
            &ObligationInput {
                price: current_price,
                atr,
                trend: regime.trend.direction,
                last_index,
                pools: &zones.pools,
                imbalances: &zones.imbalances,
                volume_nodes: &zones.volume_nodes,
            },
            &config.obligation,
        );

        let rel_volume = relative_volume(candles, RELATIVE_VOLUME_PERIOD);
        let order_book_imbalance = context.order_book_imbalance();
        let probabilities = compute_probabilities(
            &ProbabilityInput {
                regime: &regime,
                structure: &structure,
                zones: &zones,
                obligations: &obligations,
                htf_bias: context.htf_bias,
                relative_volume: rel_volume,
                order_book_imbalance,
                last_move,
                last_index,
            },
            &config.probability,
        );

        Self {
            symbol: symbol.to_string(),
            timeframe,
            current_price,
            atr,
            last_index,
            last_time,
            relative_volume: rel_volume,
            htf_bias: context.htf_bias,
            order_book_imbalance,
            swings,
            structure,
            regime,
            zones,
            obligations,
            probabilities,
        }
    }

    pub fn trend(&self) -> Bias {
        self.regime.trend.direction
    }

    /// Distance from the current price in ATR multiples (price-scaled when ATR is 0).
    pub fn distance_atr(&self, price: f64) -> f64 {
        let unit = self.atr.max(self.current_price.abs() * 1e-4);
        if unit <= 0.0 {
            return f64::INFINITY;
        }
        (price - self.current_price).abs() / unit
    }

    /// Candle index from which an event counts as recent.
    pub fn recent_since(&self, window: usize) -> usize {
        self.last_index.saturating_sub(window)
    }
}
