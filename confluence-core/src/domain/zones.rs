//! Zones of interest derived from the candle buffer.

use serde::{Deserialize, Serialize};

use super::structure::Polarity;

/// Which side of price the resting orders sit on.
///
/// Buy-side liquidity rests above swing highs (short stops, breakout buys);
/// sell-side liquidity rests below swing lows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolSide {
    BuySide,
    SellSide,
}

impl PoolSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::BuySide => Self::SellSide,
            Self::SellSide => Self::BuySide,
        }
    }
}

/// A level with resting stop orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub price: f64,
    pub side: PoolSide,
    /// 0–100.
    pub strength: f64,
    /// Two or more swing touches within tolerance (equal highs / equal lows).
    pub is_equal: bool,
    pub touches: usize,
    pub first_touch_index: usize,
    pub last_touch_index: usize,
    /// Candles since the last touch.
    pub age: usize,
    pub swept: bool,
    pub swept_index: Option<usize>,
}

impl LiquidityPool {
    /// Flag the pool as swept at `index`.
    ///
    /// The flag only ever moves false → true: a second call keeps the first index.
    pub fn mark_swept(&mut self, index: usize) {
        if !self.swept {
            self.swept = true;
            self.swept_index = Some(index);
        }
    }
}

/// Fair value gap left by a three-candle displacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imbalance {
    pub top: f64,
    pub bottom: f64,
    pub kind: Polarity,
    /// Index of the middle (displacement) candle.
    pub index: usize,
    pub mitigated: bool,
    pub mitigated_index: Option<usize>,
}

impl Imbalance {
    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    pub fn size(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn mark_mitigated(&mut self, index: usize) {
        if !self.mitigated {
            self.mitigated = true;
            self.mitigated_index = Some(index);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderBlockKind {
    OrderBlock,
    Breaker,
}

/// The last opposite-coloured candle before an impulsive displacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub top: f64,
    pub bottom: f64,
    /// Polarity the zone is expected to act with now (flipped once broken).
    pub polarity: Polarity,
    /// Polarity at formation.
    pub origin: Polarity,
    pub index: usize,
    /// Size of the displacement that validated the block, in ATR multiples.
    pub displacement_atr: f64,
    pub mitigated: bool,
    pub broken_index: Option<usize>,
    pub kind: OrderBlockKind,
}

impl OrderBlock {
    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    pub fn is_breaker(&self) -> bool {
        self.kind == OrderBlockKind::Breaker
    }
}

/// A tight sideways range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consolidation {
    pub start_index: usize,
    pub end_index: usize,
    pub high: f64,
    pub low: f64,
    /// Direction of the first close outside the range, if any.
    pub breakout: Option<Polarity>,
    pub breakout_index: Option<usize>,
}

impl Consolidation {
    pub fn height(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end_index < self.start_index
    }
}

/// A high-volume price node from the volume profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeNode {
    pub price: f64,
    pub volume: f64,
    /// Half the profile bin width; a level within this distance is co-located.
    pub half_width: f64,
}

impl VolumeNode {
    pub fn contains(&self, price: f64) -> bool {
        (price - self.price).abs() <= self.half_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> LiquidityPool {
        LiquidityPool {
            price: 100.0,
            side: PoolSide::SellSide,
            strength: 50.0,
            is_equal: true,
            touches: 2,
            first_touch_index: 3,
            last_touch_index: 9,
            age: 4,
            swept: false,
            swept_index: None,
        }
    }

    #[test]
    fn mark_swept_keeps_first_index() {
        let mut p = pool();
        p.mark_swept(12);
        p.mark_swept(20);
        assert!(p.swept);
        assert_eq!(p.swept_index, Some(12));
    }

    #[test]
    fn imbalance_midpoint() {
        let gap = Imbalance {
            top: 12.0,
            bottom: 10.0,
            kind: Polarity::Bullish,
            index: 1,
            mitigated: false,
            mitigated_index: None,
        };
        assert_eq!(gap.midpoint(), 11.0);
        assert_eq!(gap.size(), 2.0);
    }

    #[test]
    fn volume_node_contains() {
        let node = VolumeNode {
            price: 100.0,
            volume: 10.0,
            half_width: 0.5,
        };
        assert!(node.contains(100.4));
        assert!(!node.contains(100.6));
    }
}
