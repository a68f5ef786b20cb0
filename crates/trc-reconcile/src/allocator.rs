//! Greedy, order-preserving quantity allocation for a single order.
//!
//! Candidates are consumed in index order until the order's requested
//! quantity is reached:
//!
//! - a trade that fits in the remaining room is taken whole (`MATCHED` when
//!   its quantity equals the order's requested quantity, else `PARTIAL`);
//! - a trade larger than the remaining room is truncated to exactly the room
//!   and labelled `EXCESS`. Its leftover units are dropped, not returned to
//!   any pool.
//!
//! A zero-quantity trade still fits the room, so it yields a `PARTIAL`
//! allocation of quantity 0 (unless the order itself asks for exactly 0).
//!
//! Trades are never mutated and no consumption is shared across orders.

use crate::types::{BrokerTrade, Order, ResultStatus};

/// One slice of a broker trade assigned to an order, before costing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeAllocation<'a> {
    pub trade: &'a BrokerTrade,
    pub quantity: u64,
    pub status: ResultStatus,
}

/// Allocator output for one order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationPlan<'a> {
    pub allocations: Vec<TradeAllocation<'a>>,
    /// `true` once the requested quantity is fully covered (trivially so for
    /// a zero-quantity order that has candidates).
    pub fully_consumed: bool,
}

impl AllocationPlan<'_> {
    /// Units allocated across all slices, excess included.
    pub fn allocated_quantity(&self) -> u64 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

pub fn allocate<'a>(order: &Order, candidates: &[&'a BrokerTrade]) -> AllocationPlan<'a> {
    if candidates.is_empty() {
        return AllocationPlan {
            allocations: Vec::new(),
            fully_consumed: false,
        };
    }

    let requested = order.quantity;
    let mut matched_so_far: u64 = 0;
    let mut allocations = Vec::new();

    for &trade in candidates {
        if matched_so_far >= requested {
            break;
        }

        let room = requested - matched_so_far;
        if trade.quantity <= room {
            let status = if trade.quantity == requested {
                ResultStatus::Matched
            } else {
                ResultStatus::Partial
            };
            allocations.push(TradeAllocation {
                trade,
                quantity: trade.quantity,
                status,
            });
            matched_so_far += trade.quantity;
        } else {
            allocations.push(TradeAllocation {
                trade,
                quantity: room,
                status: ResultStatus::Excess,
            });
            matched_so_far += room;
        }
    }

    AllocationPlan {
        allocations,
        fully_consumed: matched_so_far >= requested,
    }
}
