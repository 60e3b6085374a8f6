//! Read-only diagnostics over a finished market state: trap zones and the
//! obligation roadmap.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, PoolSide, Polarity, StructureKind};
use crate::engine::MarketState;
use crate::obligation::ObligationKind;

/// Candles within which a close back across a BOS level marks it failed.
pub const FAILED_BREAK_WINDOW: usize = 3;
/// Maximum roadmap waypoints.
pub const ROADMAP_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrapKind {
    /// A pool was swept and price closed back.
    StopHunt,
    /// A break of structure that price reclaimed within a few candles.
    FailedBreak,
}

/// A level where participants on one side were trapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrapZone {
    pub kind: TrapKind,
    pub price: f64,
    /// Side that was trapped: buyers trapped above a buy-side sweep are `Bullish`.
    pub trapped: Polarity,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub kind: ObligationKind,
    pub price: f64,
    pub urgency: f64,
    pub distance_atr: f64,
    pub direction: Polarity,
}

/// Stop hunts from swept pools and failed breaks of structure, oldest first.
pub fn trap_zones(candles: &[Candle], state: &MarketState) -> Vec<TrapZone> {
    let mut traps: Vec<TrapZone> = state
        .zones
        .pools
        .iter()
        .filter_map(|pool| {
            let index = pool.swept_index?;
            let trapped = match pool.side {
                PoolSide::BuySide => Polarity::Bullish,
                PoolSide::SellSide => Polarity::Bearish,
            };
            Some(TrapZone {
                kind: TrapKind::StopHunt,
                price: pool.price,
                trapped,
                index,
            })
        })
        .collect();

    for marker in state
        .structure
        .markers
        .iter()
        .filter(|m| m.kind == StructureKind::BreakOfStructure)
    {
        let s = marker.direction.sign();
        let reclaimed = candles
            .get(marker.index + 1..)
            .unwrap_or(&[])
            .iter()
            .take(FAILED_BREAK_WINDOW)
            .any(|c| (c.close - marker.price) * s < 0.0);
        if reclaimed {
            traps.push(TrapZone {
                kind: TrapKind::FailedBreak,
                price: marker.price,
                trapped: marker.direction,
                index: marker.index,
            });
        }
    }

    traps.sort_by_key(|t| t.index);
    traps
}

/// Up to [`ROADMAP_LEN`] obligation waypoints, nearest first.
pub fn roadmap(state: &MarketState) -> Vec<RoadmapStep> {
    let mut steps: Vec<RoadmapStep> = state
        .obligations
        .obligations
        .iter()
        .map(|o| RoadmapStep {
            kind: o.kind,
            price: o.price,
            urgency: o.urgency,
            distance_atr: o.distance_atr,
            direction: o.direction,
        })
        .collect();
    steps.sort_by(|a, b| a.distance_atr.total_cmp(&b.distance_atr));
    steps.truncate(ROADMAP_LEN);
    steps
}
