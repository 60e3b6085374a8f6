//! Confluence runner: collaborators, enrichment, and batch analysis.
//!
//! Sits between the pure analysis core and the outside world:
//! - `provider`: async traits for market data, bias services and outcomes
//! - `enrichment`: concurrent, timeout-bounded context gathering
//! - `data_loader`: CSV and synthetic candle series
//! - `runner`: single-symbol, multi-symbol and pre-loaded batch runs

pub mod config;
pub mod data_loader;
pub mod enrichment;
pub mod provider;
pub mod runner;

pub use config::RunnerConfig;
pub use data_loader::{
    csv_series, load_csv, read_candles, synthetic_candles, synthetic_series, DataSource, LoadError,
    LoadedSeries,
};
pub use enrichment::{structure_bias, Enricher};
pub use provider::{
    BiasProvider, BiasSource, InMemoryMarketData, InMemoryOutcomes, MarketDataSource,
    OutcomeHistory, ProviderError, StaticBias,
};
pub use runner::{RunError, Runner, SymbolRun};
