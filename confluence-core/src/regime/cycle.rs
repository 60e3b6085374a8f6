//! Market cycle (BULL / BEAR / SIDEWAYS) and cycle-shift detection.

use serde::{Deserialize, Serialize};

use crate::config::RegimeConfig;
use crate::domain::{Candle, StructureMarker};
use crate::indicators::linear_regression;

/// Regression horizons combined into the cycle score.
const HORIZONS: [usize; 3] = [20, 50, 100];
/// Markers counted for structural dominance.
const DOMINANCE_WINDOW: usize = 20;
/// Number of readings in a shift history.
pub const HISTORY_LEN: usize = 5;

const SLOPE_WEIGHT: f64 = 0.5;
const R2_WEIGHT: f64 = 0.3;
const DOMINANCE_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cycle {
    Bull,
    Bear,
    #[default]
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CycleReading {
    pub cycle: Cycle,
    /// |score| · 100.
    pub strength: f64,
    /// Combined score in [-1, 1].
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleShift {
    pub from: Cycle,
    pub to: Cycle,
    /// Share of the last three readings agreeing with `to`.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegimeTransition {
    pub current: Cycle,
    /// Most likely cycle after the current one.
    pub next: Cycle,
    /// 0–100 likelihood that `next` is (or becomes) the prevailing cycle.
    pub probability: f64,
    pub shift: Option<CycleShift>,
    /// Readings oldest first, ending with the current one.
    pub history: Vec<Cycle>,
}

/// Score the cycle of a candle buffer.
///
/// Each available horizon contributes `0.5·slope + 0.3·R²·sign(slope)`, with
/// the slope normalised by the impulsive threshold and clamped to [-1, 1].
/// Horizon contributions are averaged and `0.2·dominance` of bullish over
/// bearish markers is added.
pub fn classify_cycle(
    candles: &[Candle],
    markers: &[StructureMarker],
    config: &RegimeConfig,
) -> CycleReading {
    let n = candles.len();
    if n < config.min_candles.max(2) {
        return CycleReading::default();
    }

    let mut horizons: Vec<usize> = HORIZONS.iter().copied().filter(|&h| h <= n).collect();
    if horizons.is_empty() {
        horizons.push(n);
    }

    let trend_part = horizons
        .iter()
        .map(|&h| {
            let closes: Vec<f64> = candles[n - h..].iter().map(|c| c.close).collect();
            let reg = linear_regression(&closes);
            let slope_pct = reg.slope_pct();
            let slope_norm = if config.impulsive_slope_pct > 0.0 {
                (slope_pct / config.impulsive_slope_pct).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            let sign = if slope_pct > 0.0 {
                1.0
            } else if slope_pct < 0.0 {
                -1.0
            } else {
                0.0
            };
            SLOPE_WEIGHT * slope_norm + R2_WEIGHT * reg.r_squared * sign
        })
        .sum::<f64>()
        / horizons.len() as f64;

    let recent = &markers[markers.len().saturating_sub(DOMINANCE_WINDOW)..];
    let dominance = if recent.is_empty() {
        0.0
    } else {
        recent.iter().map(|m| m.direction.sign()).sum::<f64>() / recent.len() as f64
    };

    let score = (trend_part + DOMINANCE_WEIGHT * dominance).clamp(-1.0, 1.0);
    let score = if score.is_finite() { score } else { 0.0 };
    let cycle = if score > config.cycle_threshold {
        Cycle::Bull
    } else if score < -config.cycle_threshold {
        Cycle::Bear
    } else {
        Cycle::Sideways
    };

    CycleReading {
        cycle,
        strength: score.abs() * 100.0,
        score,
    }
}

/// Re-read the cycle at cut-offs `n − k·step` for k = 4..0.
///
/// Cut-offs with too little history are skipped, so the result may be
/// shorter than [`HISTORY_LEN`]. Markers are limited to those confirmed
/// before each cut-off.
pub fn cycle_history(
    candles: &[Candle],
    markers: &[StructureMarker],
    config: &RegimeConfig,
) -> Vec<Cycle> {
    let n = candles.len();
    let step = config.history_step.max(1);
    (0..HISTORY_LEN)
        .rev()
        .filter_map(|k| n.checked_sub(k * step))
        .filter(|&cut| cut >= config.min_candles.max(2))
        .map(|cut| {
            let visible: Vec<StructureMarker> =
                markers.iter().filter(|m| m.index < cut).copied().collect();
            classify_cycle(&candles[..cut], &visible, config).cycle
        })
        .collect()
}

/// Flag a shift when the current reading differs from the one four steps
/// back and at least two of the last three readings agree with it.
pub fn detect_shift(history: &[Cycle]) -> Option<CycleShift> {
    if history.len() < HISTORY_LEN {
        return None;
    }
    let tail = &history[history.len() - HISTORY_LEN..];
    let current = tail[HISTORY_LEN - 1];
    let back = tail[0];
    if current == back {
        return None;
    }
    let matches = tail[HISTORY_LEN - 3..].iter().filter(|&&c| c == current).count();
    (matches >= 2).then(|| CycleShift {
        from: back,
        to: current,
        confidence: matches as f64 / 3.0,
    })
}

/// Current cycle, detected shift, and the most likely next cycle.
///
/// With a shift, `next` is the new cycle and `probability` its confidence.
/// Otherwise `next` is the cycle most often seen among the last three
/// readings other than the current one, with `probability` its share of
/// those readings; 0 when all agree with the current cycle.
pub fn regime_transition(
    candles: &[Candle],
    markers: &[StructureMarker],
    config: &RegimeConfig,
) -> RegimeTransition {
    let history = cycle_history(candles, markers, config);
    let Some(&current) = history.last() else {
        return RegimeTransition::default();
    };

    if let Some(shift) = detect_shift(&history) {
        return RegimeTransition {
            current,
            next: shift.to,
            probability: shift.confidence * 100.0,
            shift: Some(shift),
            history,
        };
    }

    let tail = &history[history.len().saturating_sub(3)..];
    let (next, count) = [Cycle::Bull, Cycle::Bear, Cycle::Sideways]
        .into_iter()
        .filter(|&c| c != current)
        .map(|c| (c, tail.iter().filter(|&&t| t == c).count()))
        .max_by_key(|&(_, count)| count)
        .unwrap_or((current, 0));

    let (next, probability) = if count == 0 {
        (current, 0.0)
    } else {
        (next, count as f64 / tail.len() as f64 * 100.0)
    };

    RegimeTransition {
        current,
        next,
        probability,
        shift: None,
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn config() -> RegimeConfig {
        RegimeConfig::default()
    }

    #[test]
    fn shift_requires_full_history() {
        assert!(detect_shift(&[Cycle::Bear, Cycle::Bull, Cycle::Bull]).is_none());
    }

    #[test]
    fn shift_detected_with_two_of_three() {
        let h = [Cycle::Bear, Cycle::Bear, Cycle::Bull, Cycle::Sideways, Cycle::Bull];
        let shift = detect_shift(&h).unwrap();
        assert_eq!(shift.from, Cycle::Bear);
        assert_eq!(shift.to, Cycle::Bull);
        assert!((shift.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn no_shift_when_unchanged_from_four_back() {
        let h = [Cycle::Bull, Cycle::Bear, Cycle::Bear, Cycle::Bull, Cycle::Bull];
        assert!(detect_shift(&h).is_none());
    }

    #[test]
    fn no_shift_with_single_agreeing_reading() {
        let h = [Cycle::Bear, Cycle::Bear, Cycle::Bear, Cycle::Sideways, Cycle::Bull];
        assert!(detect_shift(&h).is_none());
    }

    #[test]
    fn rising_series_reads_bull() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let reading = classify_cycle(&make_candles(&closes), &[], &config());
        assert_eq!(reading.cycle, Cycle::Bull);
        assert!(reading.strength > 25.0);
    }

    #[test]
    fn falling_series_reads_bear() {
        let closes: Vec<f64> = (0..120).map(|i| 300.0 - i as f64).collect();
        let reading = classify_cycle(&make_candles(&closes), &[], &config());
        assert_eq!(reading.cycle, Cycle::Bear);
    }

    #[test]
    fn short_buffer_reads_sideways() {
        let reading = classify_cycle(&make_candles(&[1.0, 2.0, 3.0]), &[], &config());
        assert_eq!(reading, CycleReading::default());
    }

    #[test]
    fn history_has_five_readings_with_enough_candles() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);
        let history = cycle_history(&candles, &[], &config());
        assert_eq!(history.len(), HISTORY_LEN);
        assert!(history.iter().all(|&c| c == Cycle::Bull));
    }

    #[test]
    fn reversal_produces_transition() {
        let mut closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64 * 0.5).collect();
        let top = *closes.last().unwrap();
        closes.extend((1..=25).map(|i| top - i as f64 * 3.0));
        let t = regime_transition(&make_candles(&closes), &[], &config());
        assert_eq!(
            t.history,
            vec![Cycle::Bull, Cycle::Sideways, Cycle::Sideways, Cycle::Bear, Cycle::Bear]
        );
        let shift = t.shift.expect("bull to bear shift");
        assert_eq!(shift.from, Cycle::Bull);
        assert_eq!(shift.to, Cycle::Bear);
        assert_eq!(t.next, Cycle::Bear);
        assert!((t.probability - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn stable_trend_has_no_transition() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let t = regime_transition(&make_candles(&closes), &[], &config());
        assert_eq!(t.current, Cycle::Bull);
        assert_eq!(t.next, Cycle::Bull);
        assert_eq!(t.probability, 0.0);
        assert!(t.shift.is_none());
    }
}
