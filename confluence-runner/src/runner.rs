//! Analysis runner: wires collaborators, enrichment and the core analyzer.
//!
//! Three entry points:
//! - `analyze_symbol()`: fetch history, enrich, analyze one symbol.
//! - `analyze_symbols()`: the same for many symbols, bounded concurrency.
//! - `analyze_loaded()`: pre-loaded series (CSV, synthetic) on the rayon pool,
//!   with no collaborator calls.

use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use confluence_core::config::ConfigError;
use confluence_core::domain::{Candle, EnrichmentContext, Timeframe};
use confluence_core::engine::{AnalysisError, AnalysisOptions, AnalysisResult, Analyzer, Clock};

use crate::config::RunnerConfig;
use crate::data_loader::{LoadError, LoadedSeries};
use crate::enrichment::Enricher;
use crate::provider::{BiasProvider, MarketDataSource, OutcomeHistory, ProviderError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

/// Per-symbol outcome of a batch run.
#[derive(Debug)]
pub struct SymbolRun {
    pub symbol: String,
    pub result: Result<AnalysisResult, RunError>,
}

impl SymbolRun {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Owns the analyzer and the collaborators for repeated runs.
pub struct Runner {
    config: RunnerConfig,
    analyzer: Analyzer,
    market: Arc<dyn MarketDataSource>,
    enricher: Enricher,
}

impl Runner {
    pub fn new(
        config: RunnerConfig,
        market: Arc<dyn MarketDataSource>,
        bias: Vec<Arc<dyn BiasProvider>>,
        outcomes: Option<Arc<dyn OutcomeHistory>>,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let analyzer = Analyzer::new(config.analysis.clone())?;
        let enricher = Enricher::new(Arc::clone(&market), bias, outcomes, config.enrichment_timeout())
            .with_limits(config.htf_history_limit, config.order_book_depth)
            .with_swings(config.analysis.swings.clone());
        Ok(Self {
            config,
            analyzer,
            market,
            enricher,
        })
    }

    /// Replace the analyzer's wall clock (cooldown windows).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.analyzer = self.analyzer.with_clock(clock);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Feed back whether a prediction for `symbol` played out. Two failures
    /// in a row cool the symbol down.
    pub fn record_outcome(&self, symbol: &str, success: bool) {
        if let Some(window) = self.analyzer.record_outcome(symbol, success) {
            info!(symbol, until_ms = window.until_ms, "symbol cooling down after failed predictions");
        }
    }

    /// Fetch, enrich and analyze one symbol.
    pub async fn analyze_symbol(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<AnalysisResult, RunError> {
        // Step 1: Primary history (hard requirement, bounded)
        let timeout = self.config.history_timeout();
        let fetch = self
            .market
            .fetch_history(symbol, timeframe, self.config.history_limit);
        let candles = match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::Timeout {
                    service: "history".into(),
                    timeout_ms: self.config.history_timeout_ms,
                }
                .into())
            }
        };

        // Step 2: Enrichment (soft, never fails)
        let context = self.enricher.enrich(symbol, timeframe).await;

        // Step 3: Analysis
        let result = self.analyze_with(&candles, symbol, timeframe, context)?;
        info!(
            symbol,
            timeframe = %timeframe,
            setups = result.setups.len(),
            regime = ?result.market_state.regime.regime,
            cooling_down = result.cooldown.active,
            "analysis complete"
        );
        Ok(result)
    }

    /// Analyze many symbols with at most `max_concurrency` in flight.
    ///
    /// Results come back in input order; one failing symbol does not stop
    /// the rest.
    pub async fn analyze_symbols(&self, symbols: &[String], timeframe: Timeframe) -> Vec<SymbolRun> {
        let runs: Vec<SymbolRun> = stream::iter(symbols)
            .map(|symbol| async move {
                SymbolRun {
                    symbol: symbol.clone(),
                    result: self.analyze_symbol(symbol, timeframe).await,
                }
            })
            .buffered(self.config.max_concurrency)
            .collect()
            .await;

        for run in runs.iter().filter(|r| !r.is_ok()) {
            if let Err(e) = &run.result {
                warn!(symbol = %run.symbol, error = %e, "symbol analysis failed");
            }
        }
        runs
    }

    /// Analyze pre-loaded series in parallel without enrichment.
    pub fn analyze_loaded(&self, series: &[LoadedSeries]) -> Vec<SymbolRun> {
        series
            .par_iter()
            .map(|s| {
                if s.is_synthetic() {
                    warn!(symbol = %s.symbol, "analyzing SYNTHETIC data");
                }
                SymbolRun {
                    symbol: s.symbol.clone(),
                    result: self.analyze_with(&s.candles, &s.symbol, s.timeframe, EnrichmentContext::default()),
                }
            })
            .collect()
    }

    fn analyze_with(
        &self,
        candles: &[Candle],
        symbol: &str,
        timeframe: Timeframe,
        context: EnrichmentContext,
    ) -> Result<AnalysisResult, RunError> {
        let options = AnalysisOptions::with_context(context);
        Ok(self.analyzer.analyze(candles, symbol, timeframe, &options)?)
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer)
            .field("enricher", &self.enricher)
            .finish()
    }
}
