//! Zone detectors: liquidity pools, imbalances, order blocks, consolidations.
//!
//! The detectors are independent of each other and only read the candle
//! buffer, the swings and the current ATR. Their lifecycle flags (swept,
//! mitigated, broken) are resolved against the whole buffer inside the call.

pub mod consolidation;
pub mod imbalance;
pub mod liquidity;
pub mod order_block;

pub use consolidation::detect_consolidations;
pub use imbalance::{detect_imbalances, refresh_mitigation};
pub use liquidity::{detect_liquidity_pools, pool_tolerance, refresh_sweeps};
pub use order_block::detect_order_blocks;

use serde::{Deserialize, Serialize};

use crate::config::ZoneConfig;
use crate::domain::{
    Candle, Consolidation, Imbalance, LiquidityPool, OrderBlock, PoolSide, SwingPoint, VolumeNode,
};
use crate::indicators::volume_nodes;

/// Every zone collection derived from one candle buffer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneSet {
    pub pools: Vec<LiquidityPool>,
    pub imbalances: Vec<Imbalance>,
    pub order_blocks: Vec<OrderBlock>,
    pub consolidations: Vec<Consolidation>,
    pub volume_nodes: Vec<VolumeNode>,
}

impl ZoneSet {
    /// Run all detectors.
    pub fn detect(candles: &[Candle], swings: &[SwingPoint], atr: f64, config: &ZoneConfig) -> Self {
        Self {
            pools: detect_liquidity_pools(candles, swings, atr, config),
            imbalances: detect_imbalances(candles, config.min_gap_pct),
            order_blocks: detect_order_blocks(
                candles,
                atr,
                config.order_block_displacement_atr,
                config.order_block_window,
            ),
            consolidations: detect_consolidations(
                candles,
                atr,
                config.consolidation_min_len,
                config.consolidation_range_atr,
            ),
            volume_nodes: volume_nodes(
                candles,
                config.volume_profile_window,
                config.volume_profile_bins,
                config.volume_node_ratio,
            ),
        }
    }

    pub fn unswept_pools(&self, side: PoolSide) -> impl Iterator<Item = &LiquidityPool> {
        self.pools.iter().filter(move |p| p.side == side && !p.swept)
    }

    pub fn unmitigated_imbalances(&self) -> impl Iterator<Item = &Imbalance> {
        self.imbalances.iter().filter(|i| !i.mitigated)
    }

    /// Most recent sweep on `side` at or after candle `since`.
    pub fn recent_sweep(&self, side: PoolSide, since: usize) -> Option<&LiquidityPool> {
        self.pools
            .iter()
            .filter(|p| p.side == side && p.swept_index.is_some_and(|i| i >= since))
            .max_by_key(|p| p.swept_index)
    }
}
