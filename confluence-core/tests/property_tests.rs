//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Any valid candle walk analyzes without panicking
//! 2. Scores stay in [0, 100] and surviving setups are well formed
//! 3. Confidence decay is identity at 0 and non-increasing in time
//! 4. Swept and mitigated flags never revert
//! 5. CHOCH markers are always high significance

use proptest::prelude::*;
use confluence_core::config::{AnalysisConfig, ZoneConfig};
use confluence_core::domain::{Candle, Significance, StructureKind, Timeframe};
use confluence_core::engine::{AnalysisOptions, Analyzer};
use confluence_core::indicators::latest_atr;
use confluence_core::probability::apply_confidence_decay;
use confluence_core::structure::find_swings;
use confluence_core::zones::{detect_imbalances, detect_liquidity_pools, refresh_mitigation, refresh_sweeps};

// ── Strategies (proptest) ────────────────────────────────────────────

/// A random walk of `len` candles built from per-candle percentage moves.
fn arb_candles(min: usize, max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((-3.0..3.0_f64, 0.0..1.5_f64, 0.0..1.5_f64, 100.0..5_000.0_f64), min..max)
        .prop_map(|steps| {
            let mut price = 100.0_f64;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (pct, up, down, volume))| {
                    let open = price;
                    let close = (open * (1.0 + pct / 100.0)).max(1.0);
                    price = close;
                    Candle::new(
                        1_700_000_000_000 + i as i64 * 3_600_000,
                        open,
                        open.max(close) * (1.0 + up / 100.0),
                        open.min(close) * (1.0 - down / 100.0),
                        close,
                        volume,
                    )
                })
                .collect()
        })
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisConfig::default()).unwrap()
}

// ── 1 & 2. Whole pipeline ────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pipeline_never_panics_and_scores_are_bounded(candles in arb_candles(50, 250)) {
        let result = analyzer()
            .analyze(&candles, "PROP", Timeframe::H1, &AnalysisOptions::default())
            .unwrap();
        for setup in &result.setups {
            prop_assert!((0.0..=100.0).contains(&setup.quant_score));
            prop_assert!(setup.quant_score >= 30.0);
            prop_assert!(setup.quant_score <= setup.raw_score + 1e-9);
            prop_assert!(setup.is_well_formed());
            prop_assert!(setup.targets[0].risk_reward >= 1.5 - 1e-9);
        }
        prop_assert!(result.regime_transition.probability >= 0.0);
        prop_assert!(result.regime_transition.probability <= 100.0);
        prop_assert!((0.0..=100.0).contains(&result.prediction.confidence));
    }

    #[test]
    fn short_buffers_are_rejected_not_panicked(candles in arb_candles(0, 50)) {
        let result = analyzer().analyze(&candles, "PROP", Timeframe::H1, &AnalysisOptions::default());
        prop_assert!(result.is_err());
    }

    // ── 5. CHOCH significance ────────────────────────────────────────

    #[test]
    fn choch_is_always_high(candles in arb_candles(50, 250)) {
        let result = analyzer()
            .analyze(&candles, "PROP", Timeframe::H1, &AnalysisOptions::default())
            .unwrap();
        for marker in result.structures.iter().filter(|m| m.kind == StructureKind::ChangeOfCharacter) {
            prop_assert_eq!(marker.significance, Significance::High);
        }
    }
}

// ── 3. Decay ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn decay_is_identity_at_zero(p in 0.0..100.0_f64, half_life in 0.5..48.0_f64) {
        prop_assert_eq!(apply_confidence_decay(p, 0.0, half_life), p);
    }

    #[test]
    fn decay_is_non_increasing(
        p in 0.0..100.0_f64,
        t1 in 0.0..100.0_f64,
        dt in 0.0..100.0_f64,
        half_life in 0.5..48.0_f64,
    ) {
        let early = apply_confidence_decay(p, t1, half_life);
        let late = apply_confidence_decay(p, t1 + dt, half_life);
        prop_assert!(late <= early);
        prop_assert!(early <= p);
    }
}

// ── 4. Lifecycle flags ───────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn swept_and_mitigated_never_revert(candles in arb_candles(30, 150)) {
        let config = ZoneConfig::default();
        let atr = latest_atr(&candles, 14);
        let swings = find_swings(&candles, 3);

        let mut pools = detect_liquidity_pools(&candles, &swings, atr, &config);
        let swept_before: Vec<Option<usize>> = pools.iter().map(|p| p.swept_index).collect();
        refresh_sweeps(&mut pools, &candles);
        for (pool, before) in pools.iter().zip(swept_before) {
            if before.is_some() {
                prop_assert!(pool.swept);
                prop_assert_eq!(pool.swept_index, before);
            }
        }

        let mut gaps = detect_imbalances(&candles, 0.0);
        let mitigated_before: Vec<Option<usize>> = gaps.iter().map(|g| g.mitigated_index).collect();
        refresh_mitigation(&mut gaps, &candles);
        for (gap, before) in gaps.iter().zip(mitigated_before) {
            if before.is_some() {
                prop_assert!(gap.mitigated);
                prop_assert_eq!(gap.mitigated_index, before);
            }
        }
    }
}
