//! Order blocks and breakers.

use crate::domain::{Candle, OrderBlock, OrderBlockKind, Polarity};

/// Detect order blocks and resolve mitigation and breaker flips.
///
/// A bullish block is a bearish candle followed by a bullish one, where some
/// close within the next `window` candles ends at least `displacement_atr`
/// ATRs above the block's high. Bearish blocks mirror this. After the
/// displacement, a revisit of the zone marks it mitigated and a close beyond
/// the far side turns it into a breaker with flipped polarity.
pub fn detect_order_blocks(
    candles: &[Candle],
    atr: f64,
    displacement_atr: f64,
    window: usize,
) -> Vec<OrderBlock> {
    let n = candles.len();
    if n < 2 || atr <= 0.0 || !atr.is_finite() || window == 0 {
        return Vec::new();
    }

    let mut blocks = Vec::new();
    for i in 0..n - 1 {
        let (ob, next) = (&candles[i], &candles[i + 1]);
        let origin = if ob.is_bearish() && next.is_bullish() {
            Polarity::Bullish
        } else if ob.is_bullish() && next.is_bearish() {
            Polarity::Bearish
        } else {
            continue;
        };

        let end = (i + window).min(n - 1);
        // Furthest favourable close in the window, measured past the block.
        let Some((peak_index, move_size)) = (i + 1..=end)
            .map(|j| {
                let size = match origin {
                    Polarity::Bullish => candles[j].close - ob.high,
                    Polarity::Bearish => ob.low - candles[j].close,
                };
                (j, size)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        let displacement = move_size / atr;
        if displacement < displacement_atr {
            continue;
        }

        let mut block = OrderBlock {
            top: ob.high,
            bottom: ob.low,
            polarity: origin,
            origin,
            index: i,
            displacement_atr: displacement,
            mitigated: false,
            broken_index: None,
            kind: OrderBlockKind::OrderBlock,
        };
        resolve_lifecycle(&mut block, candles, peak_index + 1);
        blocks.push(block);
    }
    blocks
}

fn resolve_lifecycle(block: &mut OrderBlock, candles: &[Candle], from: usize) {
    for (j, c) in candles.iter().enumerate().skip(from) {
        let (broken, revisited) = match block.origin {
            Polarity::Bullish => (c.close < block.bottom, c.low <= block.top),
            Polarity::Bearish => (c.close > block.top, c.high >= block.bottom),
        };
        if broken {
            block.mitigated = true;
            block.broken_index = Some(j);
            block.kind = OrderBlockKind::Breaker;
            block.polarity = block.origin.opposite();
            return;
        }
        if revisited {
            block.mitigated = true;
        }
    }
}
