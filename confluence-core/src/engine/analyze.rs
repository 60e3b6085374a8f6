//! The analysis orchestrator.
//!
//! One call runs the whole pipeline over a candle buffer:
//! 1. Validate input
//! 2. Consult the cooldown store
//! 3. Build the market state (swings, structure, regime, zones, obligations, probabilities)
//! 4. Regime transition and prediction
//! 5. Generate, correct, identify and score setups
//! 6. Diagnostics (trap zones, roadmap)

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, ConfigError};
use crate::diagnostics::{roadmap, trap_zones, RoadmapStep, TrapZone};
use crate::domain::{
    validate_candles, Candle, CandleError, EnrichmentContext, StructureMarker, Symbol, Timeframe,
    TradeSetup,
};
use crate::fingerprint::{setup_id, ConfigHash};
use crate::probability::{predict, Prediction};
use crate::regime::{regime_transition, RegimeTransition};
use crate::scoring::ConfluenceScorer;
use crate::setups::{enforce_invariants, StrategyRegistry};

use super::cooldown::{Clock, CooldownEntry, CooldownStatus, CooldownStore, SystemClock};
use super::market_state::MarketState;

const MS_PER_HOUR: f64 = 3_600_000.0;

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("insufficient candles: need at least {required}, got {actual}")]
    InsufficientCandles { required: usize, actual: usize },
    #[error("current price must be positive, got {0}")]
    InvalidPrice(f64),
    #[error("invalid candle data: {0}")]
    Candles(#[from] CandleError),
}

// ─── Inputs and outputs ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub context: EnrichmentContext,
    /// Reference time (ms) for setup and prediction decay. Defaults to the
    /// open time of the last candle.
    pub now_ms: Option<i64>,
}

impl AnalysisOptions {
    pub fn with_context(context: EnrichmentContext) -> Self {
        Self {
            context,
            now_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub market_state: MarketState,
    pub structures: Vec<StructureMarker>,
    /// Ranked best first; empty while the symbol is cooling down.
    pub setups: Vec<TradeSetup>,
    pub prediction: Prediction,
    pub regime_transition: RegimeTransition,
    pub trap_zones: Vec<TrapZone>,
    pub roadmap: Vec<RoadmapStep>,
    pub cooldown: CooldownStatus,
    pub config_hash: ConfigHash,
}

impl AnalysisResult {
    pub fn best_setup(&self) -> Option<&TradeSetup> {
        self.setups.first()
    }
}

// ─── Analyzer ────────────────────────────────────────────────────────

/// Runs analyses with one validated configuration.
///
/// Cheap to share: the only mutable state is the cooldown store behind an `Arc`.
pub struct Analyzer {
    config: AnalysisConfig,
    config_hash: ConfigHash,
    registry: StrategyRegistry,
    cooldowns: Arc<CooldownStore>,
    clock: Arc<dyn Clock>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = StrategyRegistry::from_config(&config);
        let cooldowns = Arc::new(CooldownStore::new(config.cooldown.clone()));
        Ok(Self {
            config_hash: ConfigHash::of(&config),
            config,
            registry,
            cooldowns,
            clock: Arc::new(SystemClock),
        })
    }

    /// Share a cooldown store between analyzers.
    pub fn with_cooldowns(mut self, cooldowns: Arc<CooldownStore>) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    pub fn cooldowns(&self) -> &Arc<CooldownStore> {
        &self.cooldowns
    }

    /// Record whether a prediction for `symbol` played out, at the clock's
    /// current time. Returns the cooldown window when this result opened one.
    pub fn record_outcome(&self, symbol: &str, success: bool) -> Option<CooldownEntry> {
        self.cooldowns.record_result(symbol, success, self.clock.now_ms())
    }

    /// Analyze one symbol's candle buffer, oldest candle first.
    pub fn analyze(
        &self,
        candles: &[Candle],
        symbol: &str,
        timeframe: Timeframe,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        // Step 1: Validate input
        let required = self.config.min_candles;
        if candles.len() < required {
            return Err(AnalysisError::InsufficientCandles {
                required,
                actual: candles.len(),
            });
        }
        validate_candles(candles)?;
        let price = candles.last().map_or(0.0, |c| c.close);
        if !price.is_finite() || price <= 0.0 {
            return Err(AnalysisError::InvalidPrice(price));
        }

        // Step 2: Cooldown
        let wall_ms = self.clock.now_ms();
        if let Some(outcomes) = &options.context.outcomes {
            self.cooldowns.record_outcomes(symbol, outcomes, wall_ms);
        }
        let cooldown = self.cooldowns.check(symbol, wall_ms);

        // Step 3: Market state
        let state = MarketState::build(candles, symbol, timeframe, &options.context, &self.config);
        debug!(
            symbol,
            %timeframe,
            regime = %state.regime.regime,
            trend = %state.trend(),
            swings = state.swings.len(),
            markers = state.structure.markers.len(),
            pools = state.zones.pools.len(),
            obligations = state.obligations.obligations.len(),
            "market state built"
        );

        // Step 4: Regime transition and prediction
        let transition = regime_transition(candles, &state.structure.markers, &self.config.regime);
        let now_ms = options.now_ms.unwrap_or(state.last_time);
        let elapsed_hours = (now_ms - state.last_time) as f64 / MS_PER_HOUR;
        let prediction = predict(
            &state.probabilities,
            state.trend(),
            &state.obligations,
            elapsed_hours,
            self.config.probability.half_life_hours,
        );

        // Step 5: Setups
        let setups = if cooldown.active {
            info!(symbol, remaining_ms = cooldown.remaining_ms, "symbol cooling down, setups suppressed");
            Vec::new()
        } else {
            self.setups(candles, &state, &options.context, now_ms)
        };

        // Step 6: Diagnostics
        let trap_zones = trap_zones(candles, &state);
        let roadmap = roadmap(&state);

        debug!(
            symbol,
            setups = setups.len(),
            best = setups.first().map_or(0.0, |s| s.quant_score),
            scenario = ?prediction.scenario,
            "analysis complete"
        );

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            timeframe,
            structures: state.structure.markers.clone(),
            market_state: state,
            setups,
            prediction,
            regime_transition: transition,
            trap_zones,
            roadmap,
            cooldown,
            config_hash: self.config_hash.clone(),
        })
    }

    fn setups(
        &self,
        candles: &[Candle],
        state: &MarketState,
        context: &EnrichmentContext,
        now_ms: i64,
    ) -> Vec<TradeSetup> {
        let scoring = &self.config.scoring;
        let candidates: Vec<TradeSetup> = self
            .registry
            .generate(candles, state)
            .into_iter()
            .map(|s| enforce_invariants(s, scoring.min_reward_risk, scoring.fallback_stop_pct))
            .map(|mut s| {
                s.id = setup_id(&state.symbol, &s);
                s
            })
            .collect();
        let generated = candidates.len();
        let scored = ConfluenceScorer::new(state, context, &self.config).score_all(candidates, now_ms);
        debug!(generated, kept = scored.len(), "setups scored");
        scored
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config_hash", &self.config_hash)
            .field("registry", &self.registry)
            .finish()
    }
}
