//! Auxiliary context supplied by external collaborators.
//!
//! Every field is optional: a missing or failed collaborator is represented
//! as `None` and treated as neutral by the scoring stages.

use serde::{Deserialize, Serialize};

use super::structure::Bias;

/// A directional reading from an enrichment service (correlation, sentiment, ...).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BiasReading {
    pub bias: Bias,
    /// Service-specific strength, informational only.
    pub score: f64,
}

impl BiasReading {
    pub fn new(bias: Bias, score: f64) -> Self {
        Self { bias, score }
    }

    pub fn neutral() -> Self {
        Self::default()
    }
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    /// `(bids - asks) / (bids + asks)` in [-1, 1]; 0.0 for an empty book.
    pub fn imbalance(&self) -> f64 {
        let bids: f64 = self.bids.iter().map(|l| l.quantity.max(0.0)).sum();
        let asks: f64 = self.asks.iter().map(|l| l.quantity.max(0.0)).sum();
        let total = bids + asks;
        if total <= 0.0 || !total.is_finite() {
            return 0.0;
        }
        (bids - asks) / total
    }
}

/// Recent prediction outcomes for a symbol, read from the tracking store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeStats {
    pub wins: u32,
    pub losses: u32,
    /// Losses in a row ending at the most recent outcome.
    pub consecutive_losses: u32,
}

/// All auxiliary inputs for one analysis call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrichmentContext {
    /// Structure trend of the next-higher timeframe.
    pub htf_bias: Option<Bias>,
    pub correlation: Option<BiasReading>,
    pub sentiment: Option<BiasReading>,
    pub on_chain: Option<BiasReading>,
    pub news: Option<BiasReading>,
    pub order_book: Option<OrderBookSnapshot>,
    pub outcomes: Option<OutcomeStats>,
}

impl EnrichmentContext {
    /// Available external bias readings, in a fixed order.
    pub fn readings(&self) -> impl Iterator<Item = &BiasReading> {
        [&self.correlation, &self.sentiment, &self.on_chain, &self.news]
            .into_iter()
            .flatten()
    }

    pub fn order_book_imbalance(&self) -> f64 {
        self.order_book.as_ref().map_or(0.0, OrderBookSnapshot::imbalance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_is_balanced() {
        assert_eq!(OrderBookSnapshot::default().imbalance(), 0.0);
    }

    #[test]
    fn bid_heavy_book_is_positive() {
        let book = OrderBookSnapshot {
            bids: vec![BookLevel { price: 99.0, quantity: 30.0 }],
            asks: vec![BookLevel { price: 101.0, quantity: 10.0 }],
        };
        assert_eq!(book.imbalance(), 0.5);
    }

    #[test]
    fn readings_skip_missing() {
        let ctx = EnrichmentContext {
            sentiment: Some(BiasReading::new(Bias::Bullish, 0.7)),
            news: Some(BiasReading::neutral()),
            ..Default::default()
        };
        assert_eq!(ctx.readings().count(), 2);
    }
}
