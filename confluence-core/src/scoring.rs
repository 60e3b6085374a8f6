//! Confluence scoring.
//!
//! Each candidate's `quant_score` is the clamped sum of seven bounded
//! contributions, decayed by the candidate's age. The consensus bonus needs
//! the full candidate set, so filtering by `min_score` happens only after
//! every candidate is scored.

use chrono::{DateTime, Timelike};

use crate::config::AnalysisConfig;
use crate::domain::{
    Direction, EnrichmentContext, PoolSide, ScoreBreakdown, StrategyKind, StructureKind, TradeSetup,
};
use crate::engine::MarketState;
use crate::probability::apply_confidence_decay;
use crate::regime::Regime;

const TECHNICAL_MAX: f64 = 20.0;
const CONSENSUS_BONUS: f64 = 4.0;
const MTF_POINTS: f64 = 20.0;
const CORRELATION_POINTS: f64 = 10.0;
const SESSION_POINTS: f64 = 10.0;
const LIQUIDITY_POINTS: f64 = 15.0;
const OBLIGATION_POINTS: f64 = 10.0;
const CHOCH_POINTS: f64 = 15.0;

/// A target within this many ATR of an unswept pool counts as targeting it.
const POOL_TARGET_TOLERANCE_ATR: f64 = 0.5;

/// London and New York killzones, UTC hours `[start, end)`.
const KILLZONES: [(u32, u32); 2] = [(7, 10), (12, 15)];

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Base technical suitability of a strategy in a regime (0–16).
pub fn technical_suitability(regime: Regime, strategy: StrategyKind) -> f64 {
    use StrategyKind::*;
    match (regime, strategy) {
        (Regime::Trending, OrderBlock) => 16.0,
        (Regime::Trending, LiquiditySweep) => 10.0,
        (Regime::Trending, Wyckoff) => 8.0,
        (Regime::Trending, BreakerFlip) => 14.0,
        (Regime::Trending, Scalp) => 12.0,
        (Regime::Ranging, OrderBlock) => 10.0,
        (Regime::Ranging, LiquiditySweep) => 16.0,
        (Regime::Ranging, Wyckoff) => 14.0,
        (Regime::Ranging, BreakerFlip) => 8.0,
        (Regime::Ranging, Scalp) => 10.0,
        (Regime::Volatile, OrderBlock) => 8.0,
        (Regime::Volatile, LiquiditySweep) => 12.0,
        (Regime::Volatile, Wyckoff) => 6.0,
        (Regime::Volatile, BreakerFlip) => 10.0,
        (Regime::Volatile, Scalp) => 6.0,
    }
}

/// Whether `time_ms` falls inside a London or New York killzone.
pub fn in_killzone(time_ms: i64) -> bool {
    DateTime::from_timestamp_millis(time_ms).is_some_and(|t| {
        let hour = t.hour();
        KILLZONES.iter().any(|&(start, end)| hour >= start && hour < end)
    })
}

/// Scores candidates against one market state.
#[derive(Debug, Clone)]
pub struct ConfluenceScorer<'a> {
    state: &'a MarketState,
    context: &'a EnrichmentContext,
    config: &'a AnalysisConfig,
}

impl<'a> ConfluenceScorer<'a> {
    pub fn new(state: &'a MarketState, context: &'a EnrichmentContext, config: &'a AnalysisConfig) -> Self {
        Self {
            state,
            context,
            config,
        }
    }

    /// Score, decay, filter and rank the full candidate set.
    pub fn score_all(&self, candidates: Vec<TradeSetup>, now_ms: i64) -> Vec<TradeSetup> {
        let breakdowns: Vec<ScoreBreakdown> = candidates
            .iter()
            .map(|setup| ScoreBreakdown {
                technical: self.technical(setup, &candidates),
                ..self.breakdown(setup)
            })
            .collect();

        let mut scored: Vec<TradeSetup> = candidates
            .into_iter()
            .zip(breakdowns)
            .map(|(mut setup, breakdown)| {
                setup.breakdown = breakdown;
                setup.raw_score = breakdown.total().clamp(0.0, 100.0);
                let age_hours = (now_ms - setup.formed_at) as f64 / MS_PER_HOUR;
                setup.quant_score = apply_confidence_decay(
                    setup.raw_score,
                    age_hours,
                    self.config.probability.half_life_hours,
                )
                .clamp(0.0, 100.0);
                setup
            })
            .filter(|s| s.quant_score >= self.config.scoring.min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.quant_score
                .total_cmp(&a.quant_score)
                .then(a.strategy.cmp(&b.strategy))
                .then(a.id.cmp(&b.id))
        });
        scored
    }

    /// Regime suitability plus the bonus for another strategy agreeing on direction.
    fn technical(&self, setup: &TradeSetup, all: &[TradeSetup]) -> f64 {
        let base = technical_suitability(self.state.regime.regime, setup.strategy);
        let agreed = all
            .iter()
            .any(|other| other.strategy != setup.strategy && other.direction == setup.direction);
        let bonus = if agreed { CONSENSUS_BONUS } else { 0.0 };
        (base + bonus).min(TECHNICAL_MAX)
    }

    /// Every contribution except `technical`, which needs the candidate set.
    pub fn breakdown(&self, setup: &TradeSetup) -> ScoreBreakdown {
        let direction = setup.direction;
        let state = self.state;

        let mtf_alignment = if state.htf_bias == Some(direction.bias()) {
            MTF_POINTS
        } else {
            0.0
        };

        let readings: Vec<_> = self.context.readings().collect();
        let agreeing = readings.iter().filter(|r| r.bias == direction.bias()).count();
        let correlation = if !readings.is_empty() && agreeing * 2 > readings.len() {
            CORRELATION_POINTS
        } else {
            0.0
        };

        let session = if state.timeframe.is_intraday() && in_killzone(setup.formed_at) {
            SESSION_POINTS
        } else {
            0.0
        };

        let target_side = match direction {
            Direction::Long => PoolSide::BuySide,
            Direction::Short => PoolSide::SellSide,
        };
        let tolerance = POOL_TARGET_TOLERANCE_ATR * state.atr;
        let targets_pool = setup.targets.iter().any(|t| {
            state
                .zones
                .unswept_pools(target_side)
                .any(|p| (p.price - t.price).abs() <= tolerance)
        });
        let liquidity_targeting = if targets_pool { LIQUIDITY_POINTS } else { 0.0 };

        let obligation = match state.obligations.primary {
            Some(primary) if primary.direction == direction.polarity() => OBLIGATION_POINTS,
            _ => 0.0,
        };

        let since = state.recent_since(self.config.scoring.choch_recency);
        let choch_alignment = match state.structure.last_of(StructureKind::ChangeOfCharacter) {
            Some(m) if m.index >= since && m.direction == direction.polarity() => CHOCH_POINTS,
            _ => 0.0,
        };

        ScoreBreakdown {
            technical: 0.0,
            mtf_alignment,
            correlation,
            session,
            liquidity_targeting,
            obligation,
            choch_alignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Bias, BiasReading, EntryZone, LiquidityPool, Polarity, Significance, StructureMarker,
    };
    use crate::setups::test_support::{quiet, state_for};

    // 2023-11-14 08:00 UTC (London killzone).
    const LONDON_MS: i64 = 1_699_948_800_000;
    // 2023-11-14 04:00 UTC.
    const ASIA_MS: i64 = 1_699_934_400_000;

    fn setup(strategy: StrategyKind, direction: Direction, formed_at: i64) -> TradeSetup {
        let (stop, target) = match direction {
            Direction::Long => (98.0, 104.0),
            Direction::Short => (102.0, 96.0),
        };
        TradeSetup::candidate(direction, strategy, EntryZone::new(99.5, 100.5, 100.0), stop, formed_at)
            .with_targets([target])
    }

    fn base_state() -> MarketState {
        let mut state = state_for(&quiet(30, 100.0));
        state.atr = 1.0;
        state.current_price = 100.0;
        state.regime.regime = Regime::Trending;
        state.zones = Default::default();
        state.obligations = Default::default();
        state.structure.markers.clear();
        state.htf_bias = None;
        state
    }

    #[test]
    fn killzone_hours() {
        assert!(in_killzone(LONDON_MS));
        assert!(!in_killzone(ASIA_MS));
        assert!(in_killzone(LONDON_MS + 5 * 3_600_000)); // 13:00
        assert!(!in_killzone(LONDON_MS + 2 * 3_600_000)); // 10:00
    }

    #[test]
    fn suitability_table_prefers_order_blocks_in_trends() {
        assert_eq!(technical_suitability(Regime::Trending, StrategyKind::OrderBlock), 16.0);
        assert_eq!(technical_suitability(Regime::Ranging, StrategyKind::LiquiditySweep), 16.0);
        for regime in Regime::ALL {
            for kind in StrategyKind::ALL {
                assert!(technical_suitability(regime, kind) <= TECHNICAL_MAX);
            }
        }
    }

    #[test]
    fn full_confluence_scores_every_component() {
        let mut state = base_state();
        state.htf_bias = Some(Bias::Bullish);
        state.zones.pools = vec![LiquidityPool {
            price: 104.2,
            side: PoolSide::BuySide,
            strength: 70.0,
            is_equal: true,
            touches: 2,
            first_touch_index: 3,
            last_touch_index: 12,
            age: 17,
            swept: false,
            swept_index: None,
        }];
        state.structure.markers.push(StructureMarker {
            kind: StructureKind::ChangeOfCharacter,
            price: 99.0,
            time: 0,
            index: 25,
            direction: Polarity::Bullish,
            significance: Significance::High,
        });
        let context = EnrichmentContext {
            sentiment: Some(BiasReading::new(Bias::Bullish, 0.6)),
            news: Some(BiasReading::new(Bias::Bullish, 0.2)),
            on_chain: Some(BiasReading::new(Bias::Bearish, 0.1)),
            ..EnrichmentContext::default()
        };
        let config = AnalysisConfig::default();
        let scorer = ConfluenceScorer::new(&state, &context, &config);
        let candidates = vec![
            setup(StrategyKind::OrderBlock, Direction::Long, LONDON_MS),
            setup(StrategyKind::BreakerFlip, Direction::Long, LONDON_MS),
        ];
        let scored = scorer.score_all(candidates, LONDON_MS);
        assert_eq!(scored.len(), 2);
        let top = &scored[0];
        assert_eq!(top.strategy, StrategyKind::OrderBlock);
        assert_eq!(top.breakdown.technical, 20.0);
        assert_eq!(top.breakdown.mtf_alignment, 20.0);
        assert_eq!(top.breakdown.correlation, 10.0);
        assert_eq!(top.breakdown.session, 10.0);
        assert_eq!(top.breakdown.liquidity_targeting, 15.0);
        assert_eq!(top.breakdown.obligation, 0.0);
        assert_eq!(top.breakdown.choch_alignment, 15.0);
        assert_eq!(top.quant_score, 90.0);
        assert_eq!(scored[1].breakdown.technical, 18.0);
    }

    #[test]
    fn low_scores_are_dropped_after_scoring() {
        let state = base_state();
        let context = EnrichmentContext::default();
        let config = AnalysisConfig::default();
        let scorer = ConfluenceScorer::new(&state, &context, &config);
        // Wyckoff in a trend, outside killzones, nothing else: 8 points.
        let scored = scorer.score_all(vec![setup(StrategyKind::Wyckoff, Direction::Short, ASIA_MS)], ASIA_MS);
        assert!(scored.is_empty());
    }

    #[test]
    fn age_decays_the_score() {
        let mut state = base_state();
        state.htf_bias = Some(Bias::Bullish);
        let context = EnrichmentContext::default();
        let config = AnalysisConfig::default();
        let scorer = ConfluenceScorer::new(&state, &context, &config);
        let candidates = vec![setup(StrategyKind::OrderBlock, Direction::Long, LONDON_MS)];
        let fresh = scorer.score_all(candidates.clone(), LONDON_MS);
        let aged = scorer.score_all(candidates, LONDON_MS + 4 * 3_600_000);
        assert_eq!(fresh[0].quant_score, 46.0);
        // Half the score after one half-life falls under the threshold.
        assert!(aged.is_empty());
    }
}
