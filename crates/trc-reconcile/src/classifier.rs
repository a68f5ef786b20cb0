use crate::allocator::{AllocationPlan, TradeAllocation};
use crate::cost::cost;
use crate::types::{AllocationRecord, Order, PendingRecord, ResultStatus};

/// Classified results for a single order.
///
/// An order lands in `pending` only when it produced no allocation at all;
/// otherwise each allocation goes to `matched` (MATCHED / PARTIAL) or
/// `excess` (EXCESS). One order can feed both of those.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultBucket {
    pub matched: Vec<AllocationRecord>,
    pub excess: Vec<AllocationRecord>,
    pub pending: Option<PendingRecord>,
}

pub fn classify(order: &Order, plan: &AllocationPlan<'_>) -> ResultBucket {
    let mut bucket = ResultBucket::default();

    if plan.is_empty() {
        // A zero-quantity order with candidates is satisfied without allocations.
        if !plan.fully_consumed {
            bucket.pending = Some(PendingRecord::for_order(order));
        }
        return bucket;
    }

    for alloc in &plan.allocations {
        let record = to_record(order, alloc);
        match record.status {
            ResultStatus::Excess => bucket.excess.push(record),
            _ => bucket.matched.push(record),
        }
    }

    bucket
}

fn to_record(order: &Order, alloc: &TradeAllocation<'_>) -> AllocationRecord {
    let c = cost(alloc.trade, alloc.quantity);
    AllocationRecord {
        order_id: order.id.clone(),
        trade_id: alloc.trade.id.clone(),
        symbol: alloc.trade.symbol.clone(),
        quantity: alloc.quantity,
        status: alloc.status,
        brokerage_cost: c.brokerage_cost,
        stt: c.stt,
        total_cost: c.total_cost,
        slippage: c.slippage,
    }
}
