//! Structural types: swing pivots, structure markers, directional enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-sided polarity of a structural event or zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Polarity {
    Bullish,
    Bearish,
}

impl Polarity {
    pub fn opposite(self) -> Self {
        match self {
            Self::Bullish => Self::Bearish,
            Self::Bearish => Self::Bullish,
        }
    }

    /// +1.0 for bullish, -1.0 for bearish.
    pub fn sign(self) -> f64 {
        match self {
            Self::Bullish => 1.0,
            Self::Bearish => -1.0,
        }
    }

    pub fn as_bias(self) -> Bias {
        match self {
            Self::Bullish => Bias::Bullish,
            Self::Bearish => Bias::Bearish,
        }
    }
}

/// Three-way directional bias (trend, higher-timeframe context, enrichment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Bias {
    pub fn polarity(self) -> Option<Polarity> {
        match self {
            Self::Bullish => Some(Polarity::Bullish),
            Self::Bearish => Some(Polarity::Bearish),
            Self::Neutral => None,
        }
    }

    pub fn sign(self) -> f64 {
        self.polarity().map_or(0.0, Polarity::sign)
    }

    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::Bullish
        } else if value < 0.0 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
        })
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.polarity() {
            Some(p) => p.fmt(f),
            None => f.write_str("neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    High,
    Low,
}

/// A fractal pivot in the candle buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub time: i64,
    pub price: f64,
    pub kind: SwingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Significance {
    Low,
    Medium,
    High,
}

impl Significance {
    /// Classify a percentage displacement: >2% High, >1% Medium, else Low.
    pub fn from_displacement_pct(pct: f64) -> Self {
        let pct = pct.abs();
        if pct > 2.0 {
            Self::High
        } else if pct > 1.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureKind {
    HigherHigh,
    HigherLow,
    LowerHigh,
    LowerLow,
    BreakOfStructure,
    ChangeOfCharacter,
}

impl StructureKind {
    pub fn is_break(self) -> bool {
        matches!(self, Self::BreakOfStructure | Self::ChangeOfCharacter)
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Self::HigherHigh => "HH",
            Self::HigherLow => "HL",
            Self::LowerHigh => "LH",
            Self::LowerLow => "LL",
            Self::BreakOfStructure => "BOS",
            Self::ChangeOfCharacter => "CHOCH",
        }
    }
}

/// A labeled structural event.
///
/// For BOS and CHOCH, `price` is always copied from the swing pivot that was
/// broken, never synthesized from the breaking candle. `index` and `time`
/// locate the candle where the event was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureMarker {
    pub kind: StructureKind,
    pub price: f64,
    pub time: i64,
    pub index: usize,
    pub direction: Polarity,
    pub significance: Significance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significance_thresholds() {
        assert_eq!(Significance::from_displacement_pct(2.5), Significance::High);
        assert_eq!(Significance::from_displacement_pct(-1.5), Significance::Medium);
        assert_eq!(Significance::from_displacement_pct(1.0), Significance::Low);
        assert_eq!(Significance::from_displacement_pct(0.0), Significance::Low);
    }

    #[test]
    fn bias_sign_roundtrip() {
        assert_eq!(Bias::from_sign(Bias::Bullish.sign()), Bias::Bullish);
        assert_eq!(Bias::from_sign(Bias::Bearish.sign()), Bias::Bearish);
        assert_eq!(Bias::from_sign(0.0), Bias::Neutral);
        assert_eq!(Bias::Neutral.polarity(), None);
    }

    #[test]
    fn polarity_opposite() {
        assert_eq!(Polarity::Bullish.opposite(), Polarity::Bearish);
        assert_eq!(Polarity::Bearish.as_bias(), Bias::Bearish);
    }
}
