//! Confluence Core: market structure analysis and setup scoring.
//!
//! This crate turns a buffer of OHLCV candles into ranked trade setups:
//! - Domain types (candles, structure markers, zones, setups, enrichment context)
//! - Swing extraction and BOS/CHOCH structure labeling
//! - Regime classification and market cycle shifts
//! - Zone detectors (liquidity pools, imbalances, order blocks, consolidations)
//! - Obligation and probabilistic engines
//! - Five setup strategies with invariant corrections
//! - Confluence scoring, cooldowns and the orchestrator
//!
//! Everything here is synchronous and free of I/O.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod obligation;
pub mod probability;
pub mod regime;
pub mod scoring;
pub mod setups;
pub mod structure;
pub mod zones;

pub use config::{AnalysisConfig, ConfigError};
pub use engine::{AnalysisError, AnalysisOptions, AnalysisResult, Analyzer};
