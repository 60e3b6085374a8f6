//! Obligation engine: which unresolved level is price most likely drawn to.
//!
//! Unswept liquidity pools and unmitigated imbalances are scored for their
//! pull on price. Candidates above their threshold are ranked by urgency and
//! the first becomes the primary obligation.

use serde::{Deserialize, Serialize};

use crate::config::ObligationConfig;
use crate::domain::{Bias, Imbalance, LiquidityPool, Polarity, PoolSide, VolumeNode};

/// Primary urgency above which the market is considered obligated.
pub const OBLIGATED_URGENCY: f64 = 80.0;

const POOL_BASE: f64 = 50.0;
const ENGINEERED_BONUS: f64 = 45.0;
const SYMMETRY_BONUS: f64 = 30.0;
const POOL_TREND_BONUS: f64 = 15.0;
const CLUSTER_BONUS: f64 = 20.0;

const IMBALANCE_BASE: f64 = 40.0;
const IMBALANCE_CAP: f64 = 90.0;
const IMBALANCE_TREND_BONUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationKind {
    BuySideLiquidity,
    SellSideLiquidity,
    BullishImbalance,
    BearishImbalance,
}

impl ObligationKind {
    pub fn is_liquidity(self) -> bool {
        matches!(self, Self::BuySideLiquidity | Self::SellSideLiquidity)
    }
}

/// Where an obligation came from: an index into the zone collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "index", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationSource {
    LiquidityPool(usize),
    Imbalance(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub kind: ObligationKind,
    pub price: f64,
    /// 0–100.
    pub urgency: f64,
    pub source: ObligationSource,
    pub distance_atr: f64,
    /// Direction price has to travel to reach the level.
    pub direction: Polarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationState {
    Obligated,
    #[default]
    Free,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObligationReport {
    /// Candidates sorted by urgency, highest first.
    pub obligations: Vec<Obligation>,
    pub primary: Option<Obligation>,
    pub state: ObligationState,
}

impl ObligationReport {
    pub fn is_obligated(&self) -> bool {
        self.state == ObligationState::Obligated
    }
}

/// Inputs of one obligation evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ObligationInput<'a> {
    pub price: f64,
    pub atr: f64,
    pub trend: Bias,
    /// Index of the last candle.
    pub last_index: usize,
    pub pools: &'a [LiquidityPool],
    pub imbalances: &'a [Imbalance],
    pub volume_nodes: &'a [VolumeNode],
}

/// Score every eligible zone and elect the primary obligation.
pub fn evaluate_obligations(input: &ObligationInput<'_>, config: &ObligationConfig) -> ObligationReport {
    if input.price <= 0.0 || !input.price.is_finite() {
        return ObligationReport::default();
    }
    let unit = input.atr.max(input.price * 1e-4);

    let mut obligations: Vec<Obligation> = Vec::new();
    for (i, pool) in input.pools.iter().enumerate() {
        if let Some(o) = score_pool(input, i, pool, unit, config) {
            obligations.push(o);
        }
    }
    for (i, gap) in input.imbalances.iter().enumerate() {
        if let Some(o) = score_imbalance(input, i, gap, unit, config) {
            obligations.push(o);
        }
    }

    obligations.sort_by(|a, b| {
        b.urgency
            .total_cmp(&a.urgency)
            .then(a.distance_atr.total_cmp(&b.distance_atr))
    });
    let primary = obligations.first().copied();
    let state = match primary {
        Some(p) if p.urgency > OBLIGATED_URGENCY => ObligationState::Obligated,
        _ => ObligationState::Free,
    };

    ObligationReport {
        obligations,
        primary,
        state,
    }
}

fn pool_distance_bonus(distance_atr: f64) -> f64 {
    match distance_atr {
        d if d <= 1.0 => 25.0,
        d if d <= 3.0 => 15.0,
        d if d <= 6.0 => 5.0,
        d if d <= 10.0 => -10.0,
        _ => -20.0,
    }
}

fn pool_age_bonus(age: usize) -> f64 {
    match age {
        a if a >= 50 => 15.0,
        a if a >= 20 => 10.0,
        _ => 5.0,
    }
}

fn score_pool(
    input: &ObligationInput<'_>,
    index: usize,
    pool: &LiquidityPool,
    unit: f64,
    config: &ObligationConfig,
) -> Option<Obligation> {
    if pool.swept {
        return None;
    }
    let (kind, direction) = match pool.side {
        PoolSide::BuySide if pool.price > input.price => {
            (ObligationKind::BuySideLiquidity, Polarity::Bullish)
        }
        PoolSide::SellSide if pool.price < input.price => {
            (ObligationKind::SellSideLiquidity, Polarity::Bearish)
        }
        _ => return None,
    };
    let distance_atr = (pool.price - input.price).abs() / unit;

    let mut score = POOL_BASE + pool_distance_bonus(distance_atr) + pool_age_bonus(pool.age);
    if pool.is_equal {
        score += ENGINEERED_BONUS;
    }
    let since = input.last_index.saturating_sub(config.symmetry_window);
    let opposite_swept = input.pools.iter().any(|p| {
        p.side == pool.side.opposite() && p.swept_index.is_some_and(|i| i >= since)
    });
    if opposite_swept {
        score += SYMMETRY_BONUS;
    }
    score += POOL_TREND_BONUS * input.trend.sign() * direction.sign();
    if input.volume_nodes.iter().any(|n| n.contains(pool.price)) {
        score += CLUSTER_BONUS;
    }

    let urgency = score.clamp(0.0, 100.0);
    (urgency > config.pool_candidate_threshold).then_some(Obligation {
        kind,
        price: pool.price,
        urgency,
        source: ObligationSource::LiquidityPool(index),
        distance_atr,
        direction,
    })
}

fn imbalance_distance_bonus(distance_atr: f64) -> f64 {
    match distance_atr {
        d if d <= 1.0 => 20.0,
        d if d <= 3.0 => 10.0,
        d if d <= 6.0 => 0.0,
        d if d <= 10.0 => -5.0,
        _ => -15.0,
    }
}

fn imbalance_freshness_bonus(age: usize) -> f64 {
    match age {
        a if a <= 10 => 10.0,
        a if a <= 30 => 5.0,
        _ => 0.0,
    }
}

fn score_imbalance(
    input: &ObligationInput<'_>,
    index: usize,
    gap: &Imbalance,
    unit: f64,
    config: &ObligationConfig,
) -> Option<Obligation> {
    if gap.mitigated {
        return None;
    }
    let target = gap.midpoint();
    let (kind, direction) = match gap.kind {
        Polarity::Bullish if target < input.price => {
            (ObligationKind::BullishImbalance, Polarity::Bearish)
        }
        Polarity::Bearish if target > input.price => {
            (ObligationKind::BearishImbalance, Polarity::Bullish)
        }
        _ => return None,
    };
    let distance_atr = (target - input.price).abs() / unit;
    let age = input.last_index.saturating_sub(gap.index);

    let score = IMBALANCE_BASE
        + imbalance_distance_bonus(distance_atr)
        + imbalance_freshness_bonus(age)
        + IMBALANCE_TREND_BONUS * input.trend.sign() * gap.kind.sign();

    let urgency = score.clamp(0.0, IMBALANCE_CAP);
    (urgency > config.imbalance_candidate_threshold).then_some(Obligation {
        kind,
        price: target,
        urgency,
        source: ObligationSource::Imbalance(index),
        distance_atr,
        direction,
    })
}
