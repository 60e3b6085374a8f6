//! Probabilistic engine: scenario probabilities and confidence decay.
//!
//! Five features are extracted relative to the current trend direction, each
//! in [0, 1] (the obligation pull is signed in [-1, 1]). They are combined
//! with the per-regime weight table from [`ProbabilityConfig`].

use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

use crate::config::ProbabilityConfig;
use crate::domain::{Bias, Polarity, PoolSide, StructureKind};
use crate::obligation::ObligationReport;
use crate::regime::{RegimeReport, TrendState};
use crate::structure::StructureAnalysis;
use crate::zones::ZoneSet;

/// Reversal signal of a recent CHOCH against the trend.
const CHOCH_TRAP: f64 = 1.0;
/// Reversal signal of a recent sweep of the liquidity the trend is running into.
const SWEEP_TRAP: f64 = 0.6;

/// `P(t) = P(0) · e^(−ln2 · t / half_life)`.
///
/// Identity for `elapsed_hours <= 0`, a non-positive half-life or any
/// non-finite argument.
pub fn apply_confidence_decay(p: f64, elapsed_hours: f64, half_life_hours: f64) -> f64 {
    if !elapsed_hours.is_finite() || elapsed_hours <= 0.0 {
        return p;
    }
    if !half_life_hours.is_finite() || half_life_hours <= 0.0 {
        return p;
    }
    p * (-LN_2 * elapsed_hours / half_life_hours).exp()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbabilityFeatures {
    pub htf_alignment: f64,
    pub structure: f64,
    pub volume: f64,
    /// Primary obligation urgency, positive when it lies in the trend direction.
    pub obligation_pull: f64,
    pub trap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Probabilities {
    pub continuation: f64,
    pub reversal: f64,
    pub liquidity_run: f64,
    pub consolidation: f64,
    pub features: ProbabilityFeatures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    Continuation,
    Reversal,
    LiquidityRun,
    Consolidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub scenario: Scenario,
    pub direction: Bias,
    /// Decayed confidence, 0–100.
    pub confidence: f64,
    pub raw_confidence: f64,
    pub target: Option<f64>,
}

/// Everything the engine reads from the market state.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityInput<'a> {
    pub regime: &'a RegimeReport,
    pub structure: &'a StructureAnalysis,
    pub zones: &'a ZoneSet,
    pub obligations: &'a ObligationReport,
    pub htf_bias: Option<Bias>,
    pub relative_volume: f64,
    /// Order book imbalance in [-1, 1], 0 when unknown.
    pub order_book_imbalance: f64,
    /// Sign of the last candle's body.
    pub last_move: f64,
    pub last_index: usize,
}

pub fn extract_features(input: &ProbabilityInput<'_>, config: &ProbabilityConfig) -> ProbabilityFeatures {
    let direction = input.regime.trend.direction;
    let d = direction.sign();

    let htf_alignment = match input.htf_bias {
        Some(h) if h != Bias::Neutral && direction != Bias::Neutral => {
            if h == direction {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.5,
    };

    let structure = if direction == Bias::Neutral {
        0.0
    } else {
        let agreement = if input.structure.trend == direction { 1.0 } else { 0.7 };
        input.regime.trend.strength / 100.0 * agreement
    };

    let rv_term = (input.relative_volume - 1.0).clamp(-1.0, 1.0);
    let move_agrees = Bias::from_sign(input.last_move).sign() * d;
    let volume = 0.5 + 0.25 * rv_term * move_agrees + 0.25 * input.order_book_imbalance.clamp(-1.0, 1.0) * d;

    let obligation_pull = match input.obligations.primary {
        Some(p) if d != 0.0 => p.urgency / 100.0 * p.direction.sign() * d,
        _ => 0.0,
    };

    let since = input.last_index.saturating_sub(config.recency_window);
    let trap = match direction.polarity() {
        Some(trend) => {
            let against = trend.opposite();
            let choch_against = input.structure.markers.iter().any(|m| {
                m.kind == StructureKind::ChangeOfCharacter && m.direction == against && m.index >= since
            });
            let swept_ahead = match trend {
                Polarity::Bullish => PoolSide::BuySide,
                Polarity::Bearish => PoolSide::SellSide,
            };
            if choch_against {
                CHOCH_TRAP
            } else if input.zones.recent_sweep(swept_ahead, since).is_some() {
                SWEEP_TRAP
            } else {
                0.0
            }
        }
        None => 0.0,
    };

    ProbabilityFeatures {
        htf_alignment,
        structure: finite_or_zero(structure).clamp(0.0, 1.0),
        volume: finite_or_zero(volume).clamp(0.0, 1.0),
        obligation_pull: finite_or_zero(obligation_pull).clamp(-1.0, 1.0),
        trap,
    }
}

/// Scenario probabilities, each clamped to [0, 100].
pub fn compute_probabilities(input: &ProbabilityInput<'_>, config: &ProbabilityConfig) -> Probabilities {
    let f = extract_features(input, config);
    let w = config.weights.for_regime(input.regime.regime);
    let total = w.total();
    let directional = if input.regime.trend.direction == Bias::Neutral {
        0.5
    } else {
        1.0
    };

    let weighted = |htf: f64, structure: f64, volume: f64, obligation: f64, trap: f64| {
        if total <= 0.0 {
            return 0.0;
        }
        (w.htf_alignment * htf
            + w.structure * structure
            + w.volume * volume
            + w.obligation * obligation
            + w.trap * trap)
            / total
            * 100.0
            * directional
    };

    let continuation = weighted(
        f.htf_alignment,
        f.structure,
        f.volume,
        (1.0 + f.obligation_pull) / 2.0,
        1.0 - f.trap,
    );
    let reversal = weighted(
        1.0 - f.htf_alignment,
        1.0 - f.structure,
        1.0 - f.volume,
        (1.0 - f.obligation_pull) / 2.0,
        f.trap,
    );

    let liquidity_run = match input.obligations.primary {
        Some(p) if p.kind.is_liquidity() => p.urgency,
        _ => 0.0,
    };

    let ranging_bonus = if input.regime.trend.state == TrendState::Ranging {
        0.25
    } else {
        0.0
    };
    let inside_range = input
        .zones
        .consolidations
        .last()
        .is_some_and(|c| c.breakout.is_none() && c.end_index + 1 >= input.last_index);
    let range_bonus = if inside_range { 0.15 } else { 0.0 };
    let consolidation = ((1.0 - f.structure) * 0.6 + ranging_bonus + range_bonus) * 100.0;

    Probabilities {
        continuation: bounded(continuation),
        reversal: bounded(reversal),
        liquidity_run: bounded(liquidity_run),
        consolidation: bounded(consolidation),
        features: f,
    }
}

/// Pick the dominant scenario and decay its confidence by `elapsed_hours`.
///
/// Ties resolve in the order continuation, reversal, liquidity run,
/// consolidation.
pub fn predict(
    probabilities: &Probabilities,
    trend: Bias,
    obligations: &ObligationReport,
    elapsed_hours: f64,
    half_life_hours: f64,
) -> Prediction {
    let candidates = [
        (Scenario::Continuation, probabilities.continuation),
        (Scenario::Reversal, probabilities.reversal),
        (Scenario::LiquidityRun, probabilities.liquidity_run),
        (Scenario::Consolidation, probabilities.consolidation),
    ];
    let (scenario, raw) = candidates
        .iter()
        .copied()
        .fold((Scenario::Consolidation, f64::NEG_INFINITY), |best, c| {
            if c.1 > best.1 {
                c
            } else {
                best
            }
        });
    let raw = bounded(raw);

    let primary = obligations.primary;
    let direction = match scenario {
        Scenario::Continuation => trend,
        Scenario::Reversal => trend.polarity().map_or(Bias::Neutral, |p| p.opposite().as_bias()),
        Scenario::LiquidityRun => primary.map_or(Bias::Neutral, |p| p.direction.as_bias()),
        Scenario::Consolidation => Bias::Neutral,
    };
    let target = primary
        .filter(|p| direction != Bias::Neutral && p.direction.as_bias() == direction)
        .map(|p| p.price);

    Prediction {
        scenario,
        direction,
        confidence: bounded(apply_confidence_decay(raw, elapsed_hours, half_life_hours)),
        raw_confidence: raw,
        target,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn bounded(v: f64) -> f64 {
    finite_or_zero(v).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obligation::{Obligation, ObligationKind, ObligationSource, ObligationState};
    use crate::regime::{Regime, TrendReading};

    fn regime(direction: Bias, strength: f64, regime: Regime, state: TrendState) -> RegimeReport {
        RegimeReport {
            regime,
            trend: TrendReading {
                direction,
                strength,
                slope_pct: 0.0,
                r_squared: 0.0,
                state,
            },
            ..Default::default()
        }
    }

    fn liquidity_primary(urgency: f64, direction: Polarity) -> ObligationReport {
        let o = Obligation {
            kind: ObligationKind::BuySideLiquidity,
            price: 110.0,
            urgency,
            source: ObligationSource::LiquidityPool(0),
            distance_atr: 2.0,
            direction,
        };
        ObligationReport {
            obligations: vec![o],
            primary: Some(o),
            state: ObligationState::Obligated,
        }
    }

    fn input<'a>(
        regime: &'a RegimeReport,
        structure: &'a StructureAnalysis,
        zones: &'a ZoneSet,
        obligations: &'a ObligationReport,
    ) -> ProbabilityInput<'a> {
        ProbabilityInput {
            regime,
            structure,
            zones,
            obligations,
            htf_bias: None,
            relative_volume: 1.0,
            order_book_imbalance: 0.0,
            last_move: 0.0,
            last_index: 100,
        }
    }

    #[test]
    fn decay_identity_at_zero() {
        assert_eq!(apply_confidence_decay(80.0, 0.0, 4.0), 80.0);
        assert_eq!(apply_confidence_decay(80.0, -3.0, 4.0), 80.0);
    }

    #[test]
    fn decay_halves_at_half_life() {
        assert!((apply_confidence_decay(80.0, 4.0, 4.0) - 40.0).abs() < 1e-9);
        assert!((apply_confidence_decay(80.0, 8.0, 4.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn decay_is_monotone() {
        let mut prev = f64::INFINITY;
        for h in 0..48 {
            let v = apply_confidence_decay(70.0, h as f64 * 0.5, 4.0);
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn liquidity_run_equals_primary_urgency() {
        let r = regime(Bias::Bullish, 60.0, Regime::Trending, TrendState::Impulsive);
        let s = StructureAnalysis::default();
        let z = ZoneSet::default();
        let o = liquidity_primary(87.0, Polarity::Bullish);
        let p = compute_probabilities(&input(&r, &s, &z, &o), &ProbabilityConfig::default());
        assert_eq!(p.liquidity_run, 87.0);
    }

    #[test]
    fn no_primary_means_no_liquidity_run() {
        let r = regime(Bias::Bullish, 60.0, Regime::Trending, TrendState::Impulsive);
        let s = StructureAnalysis::default();
        let z = ZoneSet::default();
        let o = ObligationReport::default();
        let p = compute_probabilities(&input(&r, &s, &z, &o), &ProbabilityConfig::default());
        assert_eq!(p.liquidity_run, 0.0);
    }

    #[test]
    fn htf_alignment_raises_continuation() {
        let r = regime(Bias::Bullish, 70.0, Regime::Trending, TrendState::Impulsive);
        let s = StructureAnalysis {
            trend: Bias::Bullish,
            ..Default::default()
        };
        let z = ZoneSet::default();
        let o = ObligationReport::default();
        let cfg = ProbabilityConfig::default();

        let mut aligned = input(&r, &s, &z, &o);
        aligned.htf_bias = Some(Bias::Bullish);
        let mut opposed = aligned;
        opposed.htf_bias = Some(Bias::Bearish);

        let a = compute_probabilities(&aligned, &cfg);
        let b = compute_probabilities(&opposed, &cfg);
        assert!(a.continuation > b.continuation);
        assert!(a.reversal < b.reversal);
        assert!(a.continuation > a.reversal);
    }

    #[test]
    fn flat_market_prefers_consolidation() {
        let r = RegimeReport::neutral();
        let s = StructureAnalysis::default();
        let z = ZoneSet::default();
        let o = ObligationReport::default();
        let p = compute_probabilities(&input(&r, &s, &z, &o), &ProbabilityConfig::default());
        let prediction = predict(&p, Bias::Neutral, &o, 0.0, 4.0);
        assert_eq!(prediction.scenario, Scenario::Consolidation);
        assert_eq!(prediction.direction, Bias::Neutral);
        assert_eq!(prediction.target, None);
    }

    #[test]
    fn probabilities_are_bounded() {
        let r = regime(Bias::Bearish, 100.0, Regime::Volatile, TrendState::Corrective);
        let s = StructureAnalysis::default();
        let z = ZoneSet::default();
        let o = liquidity_primary(100.0, Polarity::Bullish);
        let mut inp = input(&r, &s, &z, &o);
        inp.relative_volume = f64::NAN;
        inp.order_book_imbalance = 5.0;
        inp.last_move = -1.0;
        let p = compute_probabilities(&inp, &ProbabilityConfig::default());
        for v in [p.continuation, p.reversal, p.liquidity_run, p.consolidation] {
            assert!((0.0..=100.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn prediction_decays_with_age() {
        let probabilities = Probabilities {
            continuation: 80.0,
            reversal: 20.0,
            liquidity_run: 0.0,
            consolidation: 10.0,
            features: ProbabilityFeatures::default(),
        };
        let o = liquidity_primary(70.0, Polarity::Bullish);
        let prediction = predict(&probabilities, Bias::Bullish, &o, 4.0, 4.0);
        assert_eq!(prediction.scenario, Scenario::Continuation);
        assert_eq!(prediction.direction, Bias::Bullish);
        assert_eq!(prediction.raw_confidence, 80.0);
        assert!((prediction.confidence - 40.0).abs() < 1e-9);
        assert_eq!(prediction.target, Some(110.0));
    }
}
