//! External collaborators behind async traits.
//!
//! The core never calls these; the runner does, and turns every failure into
//! a neutral `None` before analysis.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use confluence_core::domain::{BiasReading, Candle, OrderBookSnapshot, OutcomeStats, Timeframe};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no {timeframe} history for '{symbol}'")]
    NotFound { symbol: String, timeframe: Timeframe },

    #[error("{service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("{service} timed out after {timeout_ms} ms")]
    Timeout { service: String, timeout_ms: u64 },
}

impl ProviderError {
    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

/// Candle and order book source.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Up to `limit` most recent candles, oldest first.
    async fn fetch_history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError>;

    async fn fetch_order_book(
        &self,
        _symbol: &str,
        _depth: usize,
    ) -> Result<Option<OrderBookSnapshot>, ProviderError> {
        Ok(None)
    }
}

/// Which enrichment slot a bias provider fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiasSource {
    Correlation,
    Sentiment,
    OnChain,
    News,
}

impl BiasSource {
    pub fn name(self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::Sentiment => "sentiment",
            Self::OnChain => "on_chain",
            Self::News => "news",
        }
    }
}

/// A directional opinion about a symbol from an outside service.
#[async_trait]
pub trait BiasProvider: Send + Sync {
    fn source(&self) -> BiasSource;

    async fn bias(&self, symbol: &str) -> Result<Option<BiasReading>, ProviderError>;
}

/// Win/loss record of past predictions.
#[async_trait]
pub trait OutcomeHistory: Send + Sync {
    async fn outcomes(&self, symbol: &str) -> Result<Option<OutcomeStats>, ProviderError>;
}

// ─── In-memory implementations ───────────────────────────────────────

/// Market data held in memory, for tests, demos and pre-loaded files.
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    history: HashMap<(String, Timeframe), Vec<Candle>>,
    books: HashMap<String, OrderBookSnapshot>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        self.history.insert((symbol.to_string(), timeframe), candles);
        self
    }

    pub fn with_order_book(mut self, symbol: &str, book: OrderBookSnapshot) -> Self {
        self.books.insert(symbol.to_string(), book);
        self
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketData {
    async fn fetch_history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        let candles = self
            .history
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| ProviderError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            })?;
        Ok(candles[candles.len().saturating_sub(limit)..].to_vec())
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<Option<OrderBookSnapshot>, ProviderError> {
        Ok(self.books.get(symbol).map(|book| OrderBookSnapshot {
            bids: book.bids.iter().take(depth).copied().collect(),
            asks: book.asks.iter().take(depth).copied().collect(),
        }))
    }
}

/// Fixed readings per symbol.
#[derive(Debug)]
pub struct StaticBias {
    source: BiasSource,
    readings: HashMap<String, BiasReading>,
}

impl StaticBias {
    pub fn new(source: BiasSource) -> Self {
        Self {
            source,
            readings: HashMap::new(),
        }
    }

    pub fn with_reading(mut self, symbol: &str, reading: BiasReading) -> Self {
        self.readings.insert(symbol.to_string(), reading);
        self
    }
}

#[async_trait]
impl BiasProvider for StaticBias {
    fn source(&self) -> BiasSource {
        self.source
    }

    async fn bias(&self, symbol: &str) -> Result<Option<BiasReading>, ProviderError> {
        Ok(self.readings.get(symbol).copied())
    }
}

/// Prediction outcomes recorded in process.
#[derive(Debug, Default)]
pub struct InMemoryOutcomes {
    stats: Mutex<HashMap<String, OutcomeStats>>,
}

impl InMemoryOutcomes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, symbol: &str, success: bool) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = stats.entry(symbol.to_string()).or_default();
        if success {
            entry.wins += 1;
            entry.consecutive_losses = 0;
        } else {
            entry.losses += 1;
            entry.consecutive_losses += 1;
        }
    }
}

#[async_trait]
impl OutcomeHistory for InMemoryOutcomes {
    async fn outcomes(&self, symbol: &str) -> Result<Option<OutcomeStats>, ProviderError> {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(stats.get(symbol).copied())
    }
}
