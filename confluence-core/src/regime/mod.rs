//! Regime classification: trend state, volatility bucket and market cycle.

pub mod cycle;

pub use cycle::{
    classify_cycle, cycle_history, detect_shift, regime_transition, Cycle, CycleReading,
    CycleShift, RegimeTransition,
};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RegimeConfig;
use crate::domain::{mean_close, Bias, Candle};
use crate::indicators::{latest_atr, linear_regression};
use crate::structure::StructureAnalysis;

/// Markers inspected for slope agreement.
const AGREEMENT_WINDOW: usize = 10;
/// Below this R² a corrective move is treated as a range.
const CORRECTIVE_MIN_R2: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trending,
    #[default]
    Ranging,
    Volatile,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Trending, Regime::Ranging, Regime::Volatile];
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trending => "TRENDING",
            Self::Ranging => "RANGING",
            Self::Volatile => "VOLATILE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendState {
    Impulsive,
    Corrective,
    #[default]
    Ranging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityLevel {
    #[default]
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendReading {
    pub direction: Bias,
    /// 0–100.
    pub strength: f64,
    /// Regression slope in percent of mean price per candle.
    pub slope_pct: f64,
    pub r_squared: f64,
    pub state: TrendState,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub atr: f64,
    /// ATR as a percentage of mean close.
    pub atr_pct: f64,
    pub level: VolatilityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegimeReport {
    pub regime: Regime,
    pub trend: TrendReading,
    pub volatility: VolatilityReading,
    pub cycle: CycleReading,
}

impl RegimeReport {
    /// Report used when there is not enough history: ranging, sideways, strength 0.
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Classify the regime of `candles` given their labeled structure.
///
/// Fewer than `config.min_candles` candles yields [`RegimeReport::neutral`].
pub fn detect_market_regime(
    candles: &[Candle],
    structure: &StructureAnalysis,
    config: &RegimeConfig,
) -> RegimeReport {
    let n = candles.len();
    if n < config.min_candles.max(2) {
        return RegimeReport::neutral();
    }

    let window = &candles[n.saturating_sub(config.regression_window)..];
    let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
    let reg = linear_regression(&closes);
    let slope_pct = reg.slope_pct();

    let volatility = volatility_reading(candles, window, config);
    let state = trend_state(slope_pct, structure, config);

    let regime = match state {
        TrendState::Impulsive => Regime::Trending,
        TrendState::Ranging if volatility.level == VolatilityLevel::High => Regime::Volatile,
        TrendState::Ranging => Regime::Ranging,
        TrendState::Corrective if volatility.level == VolatilityLevel::High => Regime::Volatile,
        TrendState::Corrective if reg.r_squared < CORRECTIVE_MIN_R2 => Regime::Ranging,
        TrendState::Corrective => Regime::Trending,
    };

    let direction = match structure.trend {
        Bias::Neutral if state == TrendState::Ranging => Bias::Neutral,
        Bias::Neutral => Bias::from_sign(slope_pct),
        trend => trend,
    };

    let slope_norm = if config.impulsive_slope_pct > 0.0 {
        (slope_pct.abs() / config.impulsive_slope_pct).min(1.0)
    } else {
        0.0
    };
    let strength = ((0.6 * reg.r_squared + 0.4 * slope_norm) * 100.0).clamp(0.0, 100.0);

    let cycle = classify_cycle(candles, &structure.markers, config);

    RegimeReport {
        regime,
        trend: TrendReading {
            direction,
            strength,
            slope_pct,
            r_squared: reg.r_squared,
            state,
        },
        volatility,
        cycle,
    }
}

fn trend_state(slope_pct: f64, structure: &StructureAnalysis, config: &RegimeConfig) -> TrendState {
    let magnitude = slope_pct.abs();
    if magnitude > config.impulsive_slope_pct {
        let sign = slope_pct.signum();
        let agreeing = structure
            .recent(AGREEMENT_WINDOW)
            .iter()
            .filter(|m| m.direction.sign() == sign)
            .count();
        if agreeing >= config.impulsive_agreement {
            return TrendState::Impulsive;
        }
    }
    if magnitude > config.ranging_slope_pct {
        TrendState::Corrective
    } else {
        TrendState::Ranging
    }
}

fn volatility_reading(candles: &[Candle], window: &[Candle], config: &RegimeConfig) -> VolatilityReading {
    let atr = latest_atr(candles, config.atr_period);
    let mean = mean_close(window);
    let atr_pct = if mean > 0.0 && atr.is_finite() {
        atr / mean * 100.0
    } else {
        0.0
    };
    let level = if atr_pct < config.low_volatility_pct {
        VolatilityLevel::Low
    } else if atr_pct < config.high_volatility_pct {
        VolatilityLevel::Moderate
    } else {
        VolatilityLevel::High
    };
    VolatilityReading { atr, atr_pct, level }
}
