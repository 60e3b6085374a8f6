//! Domain types for the confluence pipeline.

pub mod candle;
pub mod context;
pub mod setup;
pub mod structure;
pub mod timeframe;
pub mod zones;

pub use candle::{mean_close, validate_candles, Candle, CandleError};
pub use context::{BiasReading, BookLevel, EnrichmentContext, OrderBookSnapshot, OutcomeStats};
pub use setup::{
    reward_risk, Correction, Direction, EntryZone, ScoreBreakdown, StrategyKind, Target,
    TradeSetup,
};
pub use structure::{
    Bias, Polarity, Significance, StructureKind, StructureMarker, SwingKind, SwingPoint,
};
pub use timeframe::{ParseTimeframeError, Timeframe};
pub use zones::{
    Consolidation, Imbalance, LiquidityPool, OrderBlock, OrderBlockKind, PoolSide, VolumeNode,
};

/// Symbol type alias
pub type Symbol = String;
