use crate::money::Money;
use crate::types::BrokerTrade;

/// Costs attributed to one allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CostBreakdown {
    pub brokerage_cost: Money,
    pub stt: Money,
    pub total_cost: Money,
    pub slippage: Money,
}

/// Brokerage and STT are taken from the whole trade, never pro-rated, even
/// when only part of the trade is allocated. Slippage divides the trade's
/// full net amount by the *allocated* quantity.
pub fn cost(trade: &BrokerTrade, allocated_qty: u64) -> CostBreakdown {
    CostBreakdown {
        brokerage_cost: trade.brokerage,
        stt: trade.stt,
        total_cost: trade.brokerage.saturating_add(trade.stt),
        slippage: trade.net_amount.div_qty(allocated_qty),
    }
}
