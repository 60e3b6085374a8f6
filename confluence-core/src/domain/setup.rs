//! Trade setup candidates and their scoring record.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::structure::{Bias, Polarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn polarity(self) -> Polarity {
        match self {
            Self::Long => Polarity::Bullish,
            Self::Short => Polarity::Bearish,
        }
    }

    pub fn bias(self) -> Bias {
        self.polarity().as_bias()
    }

    /// +1.0 for long, -1.0 for short. Multiply a price delta by this to get "favourable".
    pub fn sign(self) -> f64 {
        self.polarity().sign()
    }

    pub fn from_polarity(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Bullish => Self::Long,
            Polarity::Bearish => Self::Short,
        }
    }
}

/// Closed set of setup strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    OrderBlock,
    LiquiditySweep,
    Wyckoff,
    BreakerFlip,
    Scalp,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::OrderBlock,
        StrategyKind::LiquiditySweep,
        StrategyKind::Wyckoff,
        StrategyKind::BreakerFlip,
        StrategyKind::Scalp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::OrderBlock => "order_block",
            Self::LiquiditySweep => "liquidity_sweep",
            Self::Wyckoff => "wyckoff",
            Self::BreakerFlip => "breaker_flip",
            Self::Scalp => "scalp",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub top: f64,
    pub bottom: f64,
    pub optimal: f64,
}

impl EntryZone {
    /// Build a zone from two bounds in any order; optimal is clamped inside.
    pub fn new(a: f64, b: f64, optimal: f64) -> Self {
        let top = a.max(b);
        let bottom = a.min(b);
        Self {
            top,
            bottom,
            optimal: optimal.clamp(bottom, top),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub price: f64,
    pub risk_reward: f64,
}

/// Per-component contributions to `quant_score`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub technical: f64,
    pub mtf_alignment: f64,
    pub correlation: f64,
    pub session: f64,
    pub liquidity_targeting: f64,
    pub obligation: f64,
    pub choch_alignment: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.technical
            + self.mtf_alignment
            + self.correlation
            + self.session
            + self.liquidity_targeting
            + self.obligation
            + self.choch_alignment
    }
}

/// A deterministic fix applied after generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Correction {
    /// Stop was on the wrong side of entry and was forced to a fixed percentage.
    StopForced { from: f64, to: f64 },
    /// First target was below the minimum reward:risk and was extended.
    TargetExtended { from: f64, to: f64 },
    /// Targets were missing or on the wrong side and a default was synthesized.
    TargetSynthesized { price: f64 },
}

/// A directional candidate with entry, invalidation and targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub id: String,
    pub direction: Direction,
    pub strategy: StrategyKind,
    pub entry_zone: EntryZone,
    pub stop_loss: f64,
    pub targets: Vec<Target>,
    /// Score before time decay.
    pub raw_score: f64,
    /// Final 0–100 score used for ranking and filtering.
    pub quant_score: f64,
    pub breakdown: ScoreBreakdown,
    /// Time (ms) of the candle that produced the setup.
    pub formed_at: i64,
    pub rationale: Vec<String>,
    pub corrections: Vec<Correction>,
}

impl TradeSetup {
    /// A fresh, unscored candidate. Strategies fill targets through
    /// [`TradeSetup::with_targets`] and the orchestrator assigns the id.
    pub fn candidate(
        direction: Direction,
        strategy: StrategyKind,
        entry_zone: EntryZone,
        stop_loss: f64,
        formed_at: i64,
    ) -> Self {
        Self {
            id: String::new(),
            direction,
            strategy,
            entry_zone,
            stop_loss,
            targets: Vec::new(),
            raw_score: 0.0,
            quant_score: 0.0,
            breakdown: ScoreBreakdown::default(),
            formed_at,
            rationale: Vec::new(),
            corrections: Vec::new(),
        }
    }

    pub fn with_targets(mut self, prices: impl IntoIterator<Item = f64>) -> Self {
        let risk = self.risk();
        self.targets = prices
            .into_iter()
            .map(|price| Target {
                price,
                risk_reward: reward_risk(self.direction, self.entry_zone.optimal, price, risk),
            })
            .collect();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.rationale.push(reason.into());
        self
    }

    /// Distance from optimal entry to stop (always >= 0).
    pub fn risk(&self) -> f64 {
        (self.entry_zone.optimal - self.stop_loss).abs()
    }

    pub fn first_target(&self) -> Option<&Target> {
        self.targets.first()
    }

    /// Long: stop < optimal < first target. Short: mirrored.
    pub fn is_well_formed(&self) -> bool {
        let s = self.direction.sign();
        let entry = self.entry_zone.optimal;
        match self.first_target() {
            Some(t) => (entry - self.stop_loss) * s > 0.0 && (t.price - entry) * s > 0.0,
            None => false,
        }
    }
}

/// Reward:risk of a target price, 0.0 when risk is zero.
pub fn reward_risk(direction: Direction, entry: f64, target: f64, risk: f64) -> f64 {
    if risk <= 0.0 {
        return 0.0;
    }
    (target - entry) * direction.sign() / risk
}
