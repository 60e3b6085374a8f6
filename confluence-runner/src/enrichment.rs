//! Concurrent, timeout-bounded enrichment.
//!
//! Every collaborator call runs at the same time under its own timeout. A
//! call that errors or overruns is logged and its slot left as `None`, so
//! a dead sentiment service degrades the score instead of failing the run.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use confluence_core::config::SwingConfig;
use confluence_core::domain::{Bias, Candle, EnrichmentContext, Timeframe};
use confluence_core::structure::{filter_significant_swings, find_swings, label_structure};

use crate::provider::{BiasProvider, BiasSource, MarketDataSource, OutcomeHistory, ProviderError};

/// Gathers an [`EnrichmentContext`] for one symbol.
pub struct Enricher {
    market: Arc<dyn MarketDataSource>,
    bias: Vec<Arc<dyn BiasProvider>>,
    outcomes: Option<Arc<dyn OutcomeHistory>>,
    timeout: Duration,
    htf_limit: usize,
    book_depth: usize,
    swings: SwingConfig,
}

impl Enricher {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        bias: Vec<Arc<dyn BiasProvider>>,
        outcomes: Option<Arc<dyn OutcomeHistory>>,
        timeout: Duration,
    ) -> Self {
        Self {
            market,
            bias,
            outcomes,
            timeout,
            htf_limit: 200,
            book_depth: 20,
            swings: SwingConfig::default(),
        }
    }

    pub fn with_limits(mut self, htf_limit: usize, book_depth: usize) -> Self {
        self.htf_limit = htf_limit;
        self.book_depth = book_depth;
        self
    }

    pub fn with_swings(mut self, swings: SwingConfig) -> Self {
        self.swings = swings;
        self
    }

    /// Fetch everything for `symbol`. Never fails.
    pub async fn enrich(&self, symbol: &str, timeframe: Timeframe) -> EnrichmentContext {
        let htf = self.htf_bias(symbol, timeframe);
        let book = bounded(
            "order_book",
            self.timeout,
            self.market.fetch_order_book(symbol, self.book_depth),
        );
        let outcomes = async {
            match &self.outcomes {
                Some(history) => bounded("outcomes", self.timeout, history.outcomes(symbol)).await,
                None => None,
            }
        };
        let readings = join_all(self.bias.iter().map(|provider| async move {
            let reading = bounded(provider.source().name(), self.timeout, provider.bias(symbol)).await;
            (provider.source(), reading.flatten())
        }));

        let (htf_bias, order_book, outcomes, readings) = tokio::join!(htf, book, outcomes, readings);

        let mut context = EnrichmentContext {
            htf_bias,
            order_book: order_book.flatten(),
            outcomes: outcomes.flatten(),
            ..EnrichmentContext::default()
        };
        for (source, reading) in readings {
            let slot = match source {
                BiasSource::Correlation => &mut context.correlation,
                BiasSource::Sentiment => &mut context.sentiment,
                BiasSource::OnChain => &mut context.on_chain,
                BiasSource::News => &mut context.news,
            };
            // Two providers for one slot: the first answer wins.
            if slot.is_none() {
                *slot = reading;
            }
        }

        debug!(
            symbol,
            htf = ?context.htf_bias,
            readings = context.readings().count(),
            order_book = context.order_book.is_some(),
            "enrichment gathered"
        );
        context
    }

    async fn htf_bias(&self, symbol: &str, timeframe: Timeframe) -> Option<Bias> {
        let higher = timeframe.higher()?;
        let candles = bounded(
            "htf_history",
            self.timeout,
            self.market.fetch_history(symbol, higher, self.htf_limit),
        )
        .await?;
        Some(structure_bias(&candles, higher, &self.swings))
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("bias_providers", &self.bias.len())
            .field("outcomes", &self.outcomes.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Structure trend of a candle buffer; neutral when there is too little data.
pub fn structure_bias(candles: &[Candle], timeframe: Timeframe, swings: &SwingConfig) -> Bias {
    let raw = find_swings(candles, swings.lookback_for(timeframe));
    let significant = filter_significant_swings(&raw, swings.min_move_pct);
    label_structure(candles, &significant).trend
}

/// Await `call` under `timeout`, mapping any failure to `None`.
async fn bounded<T, F>(service: &str, timeout: Duration, call: F) -> Option<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(service, error = %e, "enrichment call failed, treating as neutral");
            None
        }
        Err(_) => {
            warn!(
                service,
                timeout_ms = timeout.as_millis() as u64,
                "enrichment call timed out, treating as neutral"
            );
            None
        }
    }
}
