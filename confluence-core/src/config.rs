//! Analysis configuration.
//!
//! Every tunable constant of the pipeline lives here, grouped per stage.
//! All sections use `#[serde(default)]`, so a TOML file only needs to name
//! the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::{StrategyKind, Timeframe};
use crate::regime::Regime;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum candles for a full analysis; fewer is an input-insufficiency error.
    pub min_candles: usize,
    pub swings: SwingConfig,
    pub regime: RegimeConfig,
    pub zones: ZoneConfig,
    pub obligation: ObligationConfig,
    pub probability: ProbabilityConfig,
    pub scoring: ScoringConfig,
    pub cooldown: CooldownConfig,
    /// Strategies run by the setup generator, in registry order.
    pub strategies: Vec<StrategyKind>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_candles: 50,
            swings: SwingConfig::default(),
            regime: RegimeConfig::default(),
            zones: ZoneConfig::default(),
            obligation: ObligationConfig::default(),
            probability: ProbabilityConfig::default(),
            scoring: ScoringConfig::default(),
            cooldown: CooldownConfig::default(),
            strategies: StrategyKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Fractal lookback override; `None` uses the timeframe default.
    pub lookback: Option<usize>,
    /// Adjacent same-kind swings closer than this percentage are merged.
    pub min_move_pct: f64,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            lookback: None,
            min_move_pct: 0.15,
        }
    }
}

impl SwingConfig {
    pub fn lookback_for(&self, timeframe: Timeframe) -> usize {
        self.lookback
            .unwrap_or_else(|| timeframe.default_swing_lookback())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub regression_window: usize,
    /// Minimum candles for any regime reading.
    pub min_candles: usize,
    /// |slope| in percent of mean price per candle above which a trend can be impulsive.
    pub impulsive_slope_pct: f64,
    /// |slope| at or below this is ranging.
    pub ranging_slope_pct: f64,
    /// Markers out of the last 10 that must agree for an impulsive trend.
    pub impulsive_agreement: usize,
    pub atr_period: usize,
    pub low_volatility_pct: f64,
    pub high_volatility_pct: f64,
    /// Candles between successive cycle readings in the shift history.
    pub history_step: usize,
    /// Cycle score magnitude needed for BULL/BEAR.
    pub cycle_threshold: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            regression_window: 50,
            min_candles: 20,
            impulsive_slope_pct: 0.08,
            ranging_slope_pct: 0.01,
            impulsive_agreement: 6,
            atr_period: 14,
            low_volatility_pct: 1.0,
            high_volatility_pct: 3.0,
            history_step: 5,
            cycle_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Swing clustering tolerance in ATR multiples.
    pub equal_tolerance_atr: f64,
    /// Most recent untouched single swings per side kept as stop pools.
    pub stop_pools_per_side: usize,
    /// Minimum fair value gap as a percentage of price.
    pub min_gap_pct: f64,
    pub order_block_displacement_atr: f64,
    pub order_block_window: usize,
    pub consolidation_min_len: usize,
    pub consolidation_range_atr: f64,
    pub volume_profile_window: usize,
    pub volume_profile_bins: usize,
    pub volume_node_ratio: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            equal_tolerance_atr: 0.15,
            stop_pools_per_side: 3,
            min_gap_pct: 0.0,
            order_block_displacement_atr: 1.5,
            order_block_window: 5,
            consolidation_min_len: 8,
            consolidation_range_atr: 2.5,
            volume_profile_window: 100,
            volume_profile_bins: 24,
            volume_node_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObligationConfig {
    /// A pool scores the symmetry bonus when the opposite side was swept this recently.
    pub symmetry_window: usize,
    pub pool_candidate_threshold: f64,
    pub imbalance_candidate_threshold: f64,
}

impl Default for ObligationConfig {
    fn default() -> Self {
        Self {
            symmetry_window: 10,
            pool_candidate_threshold: 55.0,
            imbalance_candidate_threshold: 50.0,
        }
    }
}

/// Feature weights of the probabilistic engine for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeights {
    pub htf_alignment: f64,
    pub structure: f64,
    pub volume: f64,
    pub obligation: f64,
    pub trap: f64,
}

impl RegimeWeights {
    pub fn total(&self) -> f64 {
        self.htf_alignment + self.structure + self.volume + self.obligation + self.trap
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeWeightTable {
    pub trending: RegimeWeights,
    pub ranging: RegimeWeights,
    pub volatile: RegimeWeights,
}

impl Default for RegimeWeightTable {
    fn default() -> Self {
        Self {
            trending: RegimeWeights {
                htf_alignment: 0.30,
                structure: 0.30,
                volume: 0.15,
                obligation: 0.15,
                trap: 0.10,
            },
            ranging: RegimeWeights {
                htf_alignment: 0.10,
                structure: 0.15,
                volume: 0.25,
                obligation: 0.25,
                trap: 0.25,
            },
            volatile: RegimeWeights {
                htf_alignment: 0.20,
                structure: 0.20,
                volume: 0.20,
                obligation: 0.20,
                trap: 0.20,
            },
        }
    }
}

impl RegimeWeightTable {
    pub fn for_regime(&self, regime: Regime) -> &RegimeWeights {
        match regime {
            Regime::Trending => &self.trending,
            Regime::Ranging => &self.ranging,
            Regime::Volatile => &self.volatile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityConfig {
    pub half_life_hours: f64,
    /// Candles after which a sweep or CHOCH no longer counts as recent.
    pub recency_window: usize,
    pub weights: RegimeWeightTable,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 4.0,
            recency_window: 20,
            weights: RegimeWeightTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Candidates below this score are dropped after scoring.
    pub min_score: f64,
    pub min_reward_risk: f64,
    /// Stop distance (percent of entry) forced when a stop is on the wrong side.
    pub fallback_stop_pct: f64,
    /// A CHOCH older than this many candles no longer scores alignment.
    pub choch_recency: usize,
    /// Maximum distance from price, in ATR, for a zone to anchor a setup.
    pub max_entry_distance_atr: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: 30.0,
            min_reward_risk: 1.5,
            fallback_stop_pct: 1.0,
            choch_recency: 30,
            max_entry_distance_atr: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub loss_streak: u32,
    pub duration_hours: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            loss_streak: 2,
            duration_hours: 4.0,
        }
    }
}

impl CooldownConfig {
    pub fn duration_ms(&self) -> i64 {
        (self.duration_hours * 3_600_000.0).round() as i64
    }
}

impl AnalysisConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.min_candles < 10 {
            return invalid("min_candles must be >= 10");
        }
        if self.swings.lookback == Some(0) {
            return invalid("swings.lookback must be >= 1");
        }
        if self.swings.min_move_pct < 0.0 {
            return invalid("swings.min_move_pct must be >= 0");
        }
        if self.regime.regression_window < 2 || self.regime.min_candles < 2 {
            return invalid("regime windows must be >= 2");
        }
        if self.regime.ranging_slope_pct > self.regime.impulsive_slope_pct {
            return invalid("regime.ranging_slope_pct must be <= impulsive_slope_pct");
        }
        if self.regime.low_volatility_pct > self.regime.high_volatility_pct {
            return invalid("regime.low_volatility_pct must be <= high_volatility_pct");
        }
        if self.regime.history_step == 0 {
            return invalid("regime.history_step must be >= 1");
        }
        if self.zones.order_block_window == 0 || self.zones.consolidation_min_len < 2 {
            return invalid("zone windows must be positive");
        }
        if self.zones.volume_profile_bins == 0 {
            return invalid("zones.volume_profile_bins must be >= 1");
        }
        if self.probability.half_life_hours <= 0.0 {
            return invalid("probability.half_life_hours must be > 0");
        }
        for (name, w) in [
            ("trending", &self.probability.weights.trending),
            ("ranging", &self.probability.weights.ranging),
            ("volatile", &self.probability.weights.volatile),
        ] {
            if w.total() <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "probability.weights.{name} must have a positive sum"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.scoring.min_score) {
            return invalid("scoring.min_score must be within 0..=100");
        }
        if self.scoring.min_reward_risk <= 0.0 || self.scoring.fallback_stop_pct <= 0.0 {
            return invalid("scoring.min_reward_risk and fallback_stop_pct must be > 0");
        }
        if self.cooldown.duration_hours < 0.0 {
            return invalid("cooldown.duration_hours must be >= 0");
        }
        if self.strategies.is_empty() {
            return invalid("at least one strategy must be enabled");
        }
        Ok(())
    }
}
