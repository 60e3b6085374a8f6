//! Structure labeling: HH/HL/LH/LL, break of structure, change of character.
//!
//! BOS is confirmed on candle *close* only. Wick-only crossings of a pivot
//! never produce a break; that belongs to the sweep detector.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Bias, Candle, Polarity, Significance, StructureKind, StructureMarker, SwingKind, SwingPoint,
};

/// Markers considered by the trend vote.
pub const TREND_VOTE_WINDOW: usize = 10;
/// Net vote needed for a directional trend.
pub const TREND_VOTE_THRESHOLD: f64 = 2.5;

const BREAK_WEIGHT: f64 = 1.5;
const HIGH_SIGNIFICANCE_WEIGHT: f64 = 1.2;

/// Labeled structural history of one candle buffer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureAnalysis {
    /// All markers ordered by candle index.
    pub markers: Vec<StructureMarker>,
    pub trend: Bias,
    /// Net weighted vote behind `trend`.
    pub trend_score: f64,
}

impl StructureAnalysis {
    pub fn count(&self, kind: StructureKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }

    pub fn breaks(&self) -> impl Iterator<Item = &StructureMarker> {
        self.markers.iter().filter(|m| m.kind.is_break())
    }

    pub fn last_of(&self, kind: StructureKind) -> Option<&StructureMarker> {
        self.markers.iter().rev().find(|m| m.kind == kind)
    }

    /// The last `n` markers, oldest first.
    pub fn recent(&self, n: usize) -> &[StructureMarker] {
        &self.markers[self.markers.len().saturating_sub(n)..]
    }
}

/// Label the swings of `candles` and derive the current trend.
pub fn label_structure(candles: &[Candle], swings: &[SwingPoint]) -> StructureAnalysis {
    let mut markers = swing_labels(swings);
    markers.extend(breaks_of_structure(candles, swings));
    markers.sort_by_key(|m| m.index);

    let chochs = changes_of_character(candles, swings, &markers);
    markers.extend(chochs);
    markers.sort_by_key(|m| m.index);

    let (trend, trend_score) = trend_vote(&markers);
    StructureAnalysis {
        markers,
        trend,
        trend_score,
    }
}

/// Weighted vote over the last [`TREND_VOTE_WINDOW`] markers.
///
/// Each marker votes ±1 by direction, ×1.5 for BOS/CHOCH and ×1.2 for High
/// significance.
pub fn trend_vote(markers: &[StructureMarker]) -> (Bias, f64) {
    let start = markers.len().saturating_sub(TREND_VOTE_WINDOW);
    let score: f64 = markers[start..]
        .iter()
        .map(|m| {
            let mut w = m.direction.sign();
            if m.kind.is_break() {
                w *= BREAK_WEIGHT;
            }
            if m.significance == Significance::High {
                w *= HIGH_SIGNIFICANCE_WEIGHT;
            }
            w
        })
        .sum();

    let trend = if score > TREND_VOTE_THRESHOLD {
        Bias::Bullish
    } else if score < -TREND_VOTE_THRESHOLD {
        Bias::Bearish
    } else {
        Bias::Neutral
    };
    (trend, score)
}

fn displacement_pct(from: f64, to: f64) -> f64 {
    if from <= 0.0 || !from.is_finite() {
        return 0.0;
    }
    (to - from) / from * 100.0
}

// ─── Swing labels ───────────────────────────────────────────────────

fn swing_labels(swings: &[SwingPoint]) -> Vec<StructureMarker> {
    let mut prev_high: Option<f64> = None;
    let mut prev_low: Option<f64> = None;
    let mut out = Vec::new();

    for s in swings {
        let prev = match s.kind {
            SwingKind::High => prev_high.replace(s.price),
            SwingKind::Low => prev_low.replace(s.price),
        };
        let Some(prev) = prev else { continue };

        let (kind, direction) = match s.kind {
            SwingKind::High if s.price > prev => (StructureKind::HigherHigh, Polarity::Bullish),
            SwingKind::High => (StructureKind::LowerHigh, Polarity::Bearish),
            SwingKind::Low if s.price < prev => (StructureKind::LowerLow, Polarity::Bearish),
            SwingKind::Low => (StructureKind::HigherLow, Polarity::Bullish),
        };
        out.push(StructureMarker {
            kind,
            price: s.price,
            time: s.time,
            index: s.index,
            direction,
            significance: Significance::from_displacement_pct(displacement_pct(prev, s.price)),
        });
    }
    out
}

// ─── Break of structure ─────────────────────────────────────────────

/// For every pivot, the first close beyond it before (or at) the next
/// same-kind swing confirms a break at the pivot price.
fn breaks_of_structure(candles: &[Candle], swings: &[SwingPoint]) -> Vec<StructureMarker> {
    let mut out = Vec::new();

    for (pos, pivot) in swings.iter().enumerate() {
        let scan_end = swings[pos + 1..]
            .iter()
            .find(|s| s.kind == pivot.kind)
            .map_or(candles.len().saturating_sub(1), |s| s.index);
        if pivot.index + 1 > scan_end {
            continue;
        }

        let broken = candles[pivot.index + 1..=scan_end]
            .iter()
            .position(|c| match pivot.kind {
                SwingKind::High => c.close > pivot.price,
                SwingKind::Low => c.close < pivot.price,
            });
        let Some(offset) = broken else { continue };
        let index = pivot.index + 1 + offset;

        let direction = match pivot.kind {
            SwingKind::High => Polarity::Bullish,
            SwingKind::Low => Polarity::Bearish,
        };
        // Leg size: from the last opposite swing before the pivot to the pivot.
        let leg_pct = swings[..pos]
            .iter()
            .rev()
            .find(|s| s.kind != pivot.kind)
            .map_or(0.0, |origin| displacement_pct(origin.price, pivot.price));

        out.push(StructureMarker {
            kind: StructureKind::BreakOfStructure,
            price: pivot.price,
            time: candles[index].time,
            index,
            direction,
            significance: Significance::from_displacement_pct(leg_pct),
        });
    }
    out
}

// ─── Change of character ────────────────────────────────────────────

fn last_swing_before(swings: &[SwingPoint], kind: SwingKind, index: usize) -> Option<SwingPoint> {
    swings
        .iter()
        .rev()
        .find(|s| s.kind == kind && s.index < index)
        .copied()
}

/// Swing kind protected by a leg of the given direction.
fn protected_kind(leg: Polarity) -> SwingKind {
    match leg {
        Polarity::Bullish => SwingKind::Low,
        Polarity::Bearish => SwingKind::High,
    }
}

fn violates(leg: Polarity, protected: &SwingPoint, price: f64) -> bool {
    match leg {
        Polarity::Bullish => price < protected.price,
        Polarity::Bearish => price > protected.price,
    }
}

/// Walk markers in time order tracking the current leg and the swing that
/// protects it. Violating the protected swing flips the leg and emits a
/// CHOCH at that swing's price.
fn changes_of_character(
    candles: &[Candle],
    swings: &[SwingPoint],
    markers: &[StructureMarker],
) -> Vec<StructureMarker> {
    let mut leg: Option<Polarity> = None;
    let mut protected: Option<SwingPoint> = None;
    let mut out = Vec::new();

    for m in markers {
        // Price that tests the protected level: the swing itself for labels,
        // the confirming close for breaks.
        let (test_price, event_direction) = if m.kind == StructureKind::BreakOfStructure {
            (candles[m.index].close, m.direction)
        } else {
            (m.price, m.direction)
        };
        let is_swing_of_protected_kind = match (m.kind, leg) {
            (StructureKind::LowerLow | StructureKind::HigherLow, Some(Polarity::Bullish)) => true,
            (StructureKind::HigherHigh | StructureKind::LowerHigh, Some(Polarity::Bearish)) => true,
            _ => false,
        };

        match (leg, protected) {
            (Some(current), Some(p))
                if (is_swing_of_protected_kind
                    || (m.kind == StructureKind::BreakOfStructure
                        && event_direction == current.opposite()))
                    && violates(current, &p, test_price) =>
            {
                let flipped = current.opposite();
                out.push(StructureMarker {
                    kind: StructureKind::ChangeOfCharacter,
                    price: p.price,
                    time: m.time,
                    index: m.index,
                    direction: flipped,
                    significance: Significance::High,
                });
                leg = Some(flipped);
                protected = last_swing_before(swings, protected_kind(flipped), m.index);
            }
            _ if m.kind == StructureKind::BreakOfStructure => match leg {
                Some(current) if current != event_direction && protected.is_some() => {}
                _ => {
                    leg = Some(event_direction);
                    protected =
                        last_swing_before(swings, protected_kind(event_direction), m.index);
                }
            },
            _ => {}
        }
    }
    out
}
