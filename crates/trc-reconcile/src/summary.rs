use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::BrokerTrade;

/// Broker code used for trades that do not carry one.
pub const UNKNOWN_BROKER: &str = "UNKNOWN";

/// Per-broker totals over a batch of broker trades.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSummary {
    pub broker_code: String,
    pub total_trades: usize,
    pub total_quantity: u64,
    pub total_brokerage: Money,
    pub total_stt: Money,
    pub total_cost: Money,
}

/// Group trades by broker code, in order of first appearance.
pub fn broker_summary(trades: &[BrokerTrade]) -> Vec<BrokerSummary> {
    let mut out: Vec<BrokerSummary> = Vec::new();

    for t in trades {
        let code = t
            .broker_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_BROKER);

        let pos = match out.iter().position(|s| s.broker_code == code) {
            Some(p) => p,
            None => {
                out.push(BrokerSummary {
                    broker_code: code.to_string(),
                    total_trades: 0,
                    total_quantity: 0,
                    total_brokerage: Money::ZERO,
                    total_stt: Money::ZERO,
                    total_cost: Money::ZERO,
                });
                out.len() - 1
            }
        };

        let s = &mut out[pos];
        s.total_trades += 1;
        s.total_quantity = s.total_quantity.saturating_add(t.quantity);
        s.total_brokerage = s.total_brokerage.saturating_add(t.brokerage);
        s.total_stt = s.total_stt.saturating_add(t.stt);
        s.total_cost = s
            .total_cost
            .saturating_add(t.brokerage.saturating_add(t.stt));
    }

    out
}
