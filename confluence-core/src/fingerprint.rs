//! Deterministic identities: configuration hashes and setup ids.
//!
//! - `ConfigHash`: blake3 of the canonical JSON of an [`AnalysisConfig`].
//! - `setup_id`: blake3 of the fields that make a setup unique, so the same
//!   candidate produced from the same data always carries the same id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AnalysisConfig;
use crate::domain::TradeSetup;

/// Hex characters kept in a setup id.
const SETUP_ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash of a configuration. Field order is fixed by the struct, so the
    /// serialized form is canonical.
    pub fn of(config: &AnalysisConfig) -> Self {
        match serde_json::to_vec(config) {
            Ok(bytes) => Self::from_bytes(&bytes),
            // Non-finite floats cannot serialize; fall back to the debug form.
            Err(_) => Self::from_bytes(format!("{config:?}").as_bytes()),
        }
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic id for a setup on `symbol`.
pub fn setup_id(symbol: &str, setup: &TradeSetup) -> String {
    let canonical = format!(
        "{}|{}|{:?}|{}|{:.8}|{:.8}|{:.8}|{:.8}",
        symbol,
        setup.strategy,
        setup.direction,
        setup.formed_at,
        setup.entry_zone.bottom,
        setup.entry_zone.top,
        setup.entry_zone.optimal,
        setup.stop_loss,
    );
    let hex = blake3::hash(canonical.as_bytes()).to_hex();
    hex.as_str()[..SETUP_ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, EntryZone, StrategyKind};

    fn sample() -> TradeSetup {
        TradeSetup::candidate(
            Direction::Long,
            StrategyKind::OrderBlock,
            EntryZone::new(99.0, 101.0, 100.0),
            98.0,
            1_700_000_000_000,
        )
    }

    #[test]
    fn config_hash_is_deterministic() {
        let config = AnalysisConfig::default();
        assert_eq!(ConfigHash::of(&config), ConfigHash::of(&config));
        assert_eq!(ConfigHash::of(&config).0.len(), 64);
    }

    #[test]
    fn config_hash_tracks_parameters() {
        let a = AnalysisConfig::default();
        let mut b = AnalysisConfig::default();
        b.scoring.min_score = 40.0;
        assert_ne!(ConfigHash::of(&a), ConfigHash::of(&b));
    }

    #[test]
    fn setup_id_is_stable_and_symbol_scoped() {
        let s = sample();
        assert_eq!(setup_id("BTCUSDT", &s), setup_id("BTCUSDT", &s));
        assert_eq!(setup_id("BTCUSDT", &s).len(), SETUP_ID_LEN);
        assert_ne!(setup_id("BTCUSDT", &s), setup_id("ETHUSDT", &s));
    }

    #[test]
    fn setup_id_ignores_scores() {
        let a = sample();
        let mut b = sample();
        b.quant_score = 77.0;
        assert_eq!(setup_id("X", &a), setup_id("X", &b));
    }
}
