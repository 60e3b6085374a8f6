//! Post-generation invariant enforcement.
//!
//! Every candidate leaves here well formed: the stop sits on the losing side
//! of the optimal entry, every target on the winning side, targets are
//! ordered nearest first, and the first target meets the minimum
//! reward:risk. Each fix is recorded on the setup as a [`Correction`].

use crate::domain::{reward_risk, Correction, Target, TradeSetup};

/// Apply the deterministic corrections to one candidate.
pub fn enforce_invariants(mut setup: TradeSetup, min_reward_risk: f64, fallback_stop_pct: f64) -> TradeSetup {
    let s = setup.direction.sign();
    let entry = setup.entry_zone.optimal;

    if (entry - setup.stop_loss) * s <= 0.0 || !setup.stop_loss.is_finite() {
        let to = entry - s * entry.abs() * fallback_stop_pct / 100.0;
        setup.corrections.push(Correction::StopForced {
            from: setup.stop_loss,
            to,
        });
        setup.stop_loss = to;
    }
    let risk = setup.risk();

    let mut prices: Vec<f64> = setup
        .targets
        .iter()
        .map(|t| t.price)
        .filter(|p| p.is_finite() && (p - entry) * s > 0.0)
        .collect();
    prices.sort_by(|a, b| ((a - entry) * s).total_cmp(&((b - entry) * s)));
    prices.dedup();

    let required = entry + s * min_reward_risk * risk;
    match prices.first().copied() {
        None => {
            setup.corrections.push(Correction::TargetSynthesized { price: required });
            prices.push(required);
        }
        Some(first) if reward_risk(setup.direction, entry, first, risk) < min_reward_risk => {
            setup.corrections.push(Correction::TargetExtended {
                from: first,
                to: required,
            });
            prices.retain(|p| (p - required) * s > 0.0);
            prices.insert(0, required);
        }
        Some(_) => {}
    }

    setup.targets = prices
        .into_iter()
        .map(|price| Target {
            price,
            risk_reward: reward_risk(setup.direction, entry, price, risk),
        })
        .collect();
    setup
}
