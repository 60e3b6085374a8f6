//! End-to-end pipeline scenarios through the public API.
//!
//! Tests:
//! 1. Flat market: ranging regime, no breaks, no setups
//! 2. Rising staircase: bullish trend, HH/HL, bull cycle; a strictly
//!    monotone rise is bullish with no pivots at all
//! 3. Fair value gap mitigated exactly at its midpoint
//! 4. Short inputs: empty or neutral results, never a panic
//! 5. Trend reversal: CHOCH is always high significance
//! 6. Enrichment changes scoring, not structure

use confluence_core::config::{AnalysisConfig, RegimeConfig};
use confluence_core::domain::{
    Bias, BiasReading, Candle, EnrichmentContext, Polarity, Significance, StructureKind, Timeframe,
};
use confluence_core::engine::{AnalysisOptions, Analyzer};
use confluence_core::regime::{detect_market_regime, Cycle, Regime, RegimeReport};
use confluence_core::structure::{find_swings, label_structure};
use confluence_core::zones::detect_imbalances;

const T0: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

/// Candles from closes: open = previous close, wicks one point beyond the body.
fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                T0 + i as i64 * HOUR,
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1_000.0,
            )
        })
        .collect()
}

/// Six candles up by 2, four down by 1.5, repeated.
fn staircase(n: usize) -> Vec<Candle> {
    let mut closes = Vec::with_capacity(n);
    let mut price = 100.0;
    for i in 0..n {
        closes.push(price);
        price += if i % 10 < 6 { 2.0 } else { -1.5 };
    }
    candles_from_closes(&closes)
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisConfig::default()).unwrap()
}

// ── 1. Flat market ───────────────────────────────────────────────────

#[test]
fn flat_market_is_ranging_without_breaks() {
    let candles: Vec<Candle> = (0..200)
        .map(|i| Candle::new(T0 + i * HOUR, 100.0, 100.0, 100.0, 100.0, 1_000.0))
        .collect();
    let result = analyzer()
        .analyze(&candles, "FLAT", Timeframe::H1, &AnalysisOptions::default())
        .unwrap();

    let regime = &result.market_state.regime;
    assert_eq!(regime.regime, Regime::Ranging);
    assert!(regime.trend.strength < 10.0);
    assert!(result.structures.iter().all(|m| !m.kind.is_break()));
    assert!(result.setups.is_empty());
}

// ── 2. Rising staircase ──────────────────────────────────────────────

#[test]
fn rising_staircase_is_bullish() {
    let result = analyzer()
        .analyze(&staircase(60), "UP", Timeframe::H1, &AnalysisOptions::default())
        .unwrap();

    let state = &result.market_state;
    assert_eq!(state.trend(), Bias::Bullish);
    assert_eq!(state.regime.cycle.cycle, Cycle::Bull);
    let kinds: Vec<StructureKind> = result.structures.iter().map(|m| m.kind).collect();
    assert!(kinds.contains(&StructureKind::HigherHigh));
    assert!(kinds.contains(&StructureKind::HigherLow));
    assert!(!kinds.contains(&StructureKind::LowerLow));
}

#[test]
fn monotone_rise_is_bullish_without_pivots() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
    let result = analyzer()
        .analyze(&candles_from_closes(&closes), "MONO", Timeframe::H1, &AnalysisOptions::default())
        .unwrap();

    // Every high is exceeded by the next candle, so no fractal pivot forms
    // and the direction comes from the regression slope alone.
    let state = &result.market_state;
    assert!(state.swings.is_empty());
    assert!(result.structures.is_empty());
    assert_eq!(state.trend(), Bias::Bullish);
    assert_eq!(state.regime.cycle.cycle, Cycle::Bull);
}

// ── 3. Fair value gap ────────────────────────────────────────────────

#[test]
fn three_candle_gap_mitigates_at_midpoint() {
    let c = |i: i64, high: f64, low: f64| Candle::new(T0 + i * HOUR, low, high, low, high, 1_000.0);
    let mut candles = vec![c(0, 10.0, 9.0), c(1, 13.0, 9.5), c(2, 13.5, 12.0)];

    let gaps = detect_imbalances(&candles, 0.0);
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind, Polarity::Bullish);
    assert_eq!((gaps[0].top, gaps[0].bottom), (12.0, 10.0));
    assert!(!gaps[0].mitigated);

    candles.push(c(3, 13.0, 11.0));
    let gaps = detect_imbalances(&candles, 0.0);
    assert!(gaps[0].mitigated);
    assert_eq!(gaps[0].mitigated_index, Some(3));
}

// ── 4. Short inputs ──────────────────────────────────────────────────

#[test]
fn short_inputs_are_neutral() {
    for n in 0..11 {
        let candles = staircase(n);
        let swings = find_swings(&candles, 5);
        assert!(swings.is_empty());
        let structure = label_structure(&candles, &swings);
        assert!(structure.markers.is_empty());
        assert_eq!(structure.trend, Bias::Neutral);
        let regime = detect_market_regime(&candles, &structure, &RegimeConfig::default());
        assert_eq!(regime, RegimeReport::neutral());
    }
    assert!(analyzer()
        .analyze(&staircase(20), "SHORT", Timeframe::H1, &AnalysisOptions::default())
        .is_err());
}

// ── 5. Reversal ──────────────────────────────────────────────────────

#[test]
fn reversal_produces_high_significance_choch() {
    let mut candles = staircase(80);
    let top = candles.last().unwrap().close;
    let mut closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let mut price = top;
    for i in 0..60 {
        price += if i % 10 < 6 { -2.0 } else { 1.5 };
        closes.push(price);
    }
    candles = candles_from_closes(&closes);
    let result = analyzer()
        .analyze(&candles, "REV", Timeframe::H1, &AnalysisOptions::default())
        .unwrap();

    let chochs: Vec<_> = result
        .structures
        .iter()
        .filter(|m| m.kind == StructureKind::ChangeOfCharacter)
        .collect();
    assert!(!chochs.is_empty());
    assert!(chochs.iter().all(|m| m.significance == Significance::High));
    assert!(chochs.iter().any(|m| m.direction == Polarity::Bearish));
}

// ── 6. Enrichment ────────────────────────────────────────────────────

#[test]
fn enrichment_affects_scores_not_structure() {
    let candles = staircase(150);
    let a = analyzer();
    let plain = a
        .analyze(&candles, "ENR", Timeframe::H1, &AnalysisOptions::default())
        .unwrap();
    let context = EnrichmentContext {
        htf_bias: Some(Bias::Bullish),
        sentiment: Some(BiasReading::new(Bias::Bullish, 0.8)),
        news: Some(BiasReading::new(Bias::Bullish, 0.4)),
        ..EnrichmentContext::default()
    };
    let enriched = a
        .analyze(&candles, "ENR", Timeframe::H1, &AnalysisOptions::with_context(context))
        .unwrap();

    assert_eq!(plain.structures, enriched.structures);
    assert_eq!(plain.market_state.zones, enriched.market_state.zones);
    for setup in &enriched.setups {
        assert!((0.0..=100.0).contains(&setup.quant_score));
        if setup.direction.bias() == Bias::Bullish {
            assert_eq!(setup.breakdown.mtf_alignment, 20.0);
            assert_eq!(setup.breakdown.correlation, 10.0);
        }
    }
    assert!(enriched.setups.len() >= plain.setups.len());
}
