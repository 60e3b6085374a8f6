//! Analysis engine: market state construction, the orchestrator and the
//! cooldown store.
//!
//! `Analyzer::analyze` runs the pipeline in order:
//!
//! 1. Input validation and cooldown check
//! 2. Market state: swings, structure, regime, zones, obligations, probabilities
//! 3. Regime transition and prediction
//! 4. Setup generation, invariant corrections and confluence scoring
//! 5. Trap zones and roadmap

pub mod analyze;
pub mod cooldown;
pub mod market_state;

pub use analyze::{AnalysisError, AnalysisOptions, AnalysisResult, Analyzer};
pub use cooldown::{Clock, CooldownEntry, CooldownStatus, CooldownStore, ManualClock, SystemClock};
pub use market_state::MarketState;
