use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::allocator::allocate;
use crate::classifier::{classify, ResultBucket};
use crate::index::MatchIndex;
use crate::types::{
    AllocationRecord, BrokerTrade, Diagnostic, Order, PendingRecord, RecordKind, Shortfall,
};

/// Immutable result of one reconciliation run.
///
/// `matched`, `excess` and `pending` follow the order input sequence; within
/// one order, allocations follow candidate order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub matched: Vec<AllocationRecord>,
    pub excess: Vec<AllocationRecord>,
    pub pending: Vec<PendingRecord>,
    /// Orders with allocations that fall short of the requested quantity.
    pub shortfalls: Vec<Shortfall>,
    /// Records skipped because of data errors.
    pub diagnostics: Vec<Diagnostic>,
    /// Orders that passed validation and were allocated.
    pub orders_processed: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub orders_processed: usize,
    pub matched: usize,
    pub excess: usize,
    pub pending: usize,
    pub shortfalls: usize,
    pub diagnostics: usize,
}

impl ReconcileOutcome {
    pub fn stats(&self) -> ReconcileStats {
        ReconcileStats {
            orders_processed: self.orders_processed,
            matched: self.matched.len(),
            excess: self.excess.len(),
            pending: self.pending.len(),
            shortfalls: self.shortfalls.len(),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Run-scoped accumulator. Owned by one call to [`reconcile`] and frozen
/// into a [`ReconcileOutcome`] when every order has been visited.
#[derive(Default)]
struct RunState {
    outcome: ReconcileOutcome,
}

impl RunState {
    fn absorb(&mut self, bucket: ResultBucket) {
        self.outcome.matched.extend(bucket.matched);
        self.outcome.excess.extend(bucket.excess);
        self.outcome.pending.extend(bucket.pending);
    }
}

/// Reconcile client orders against broker trades for one batch.
///
/// Pure: inputs are only read, and two calls on the same inputs return equal
/// outcomes. Orders or trades failing validation are skipped and reported in
/// `diagnostics`; they never abort the run.
pub fn reconcile(orders: &[Order], trades: &[BrokerTrade]) -> ReconcileOutcome {
    let mut state = RunState::default();

    let mut valid_trades: Vec<&BrokerTrade> = Vec::with_capacity(trades.len());
    for (i, trade) in trades.iter().enumerate() {
        match trade.validate() {
            Ok(()) => valid_trades.push(trade),
            Err(error) => {
                warn!(position = i, %error, "trade skipped");
                state.outcome.diagnostics.push(Diagnostic::new(
                    RecordKind::Trade,
                    format!("trade #{i}"),
                    error,
                ));
            }
        }
    }

    let index = MatchIndex::build(valid_trades);
    debug!(trades = index.len(), groups = index.group_count(), "match index built");

    for (i, order) in orders.iter().enumerate() {
        if let Err(error) = order.validate() {
            warn!(position = i, %error, "order skipped");
            state.outcome.diagnostics.push(Diagnostic::new(
                RecordKind::Order,
                format!("order #{i}"),
                error,
            ));
            continue;
        }

        let (bucket, shortfall) = reconcile_order(&index, order);
        state.outcome.shortfalls.extend(shortfall);
        state.absorb(bucket);
        state.outcome.orders_processed += 1;
    }

    debug!(
        orders = state.outcome.orders_processed,
        matched = state.outcome.matched.len(),
        excess = state.outcome.excess.len(),
        pending = state.outcome.pending.len(),
        "reconcile complete"
    );

    state.outcome
}

/// Lookup, allocate and classify one order against a prebuilt index.
pub fn reconcile_order(index: &MatchIndex<'_>, order: &Order) -> (ResultBucket, Option<Shortfall>) {
    let candidates = index.lookup(order);
    let plan = allocate(order, candidates);

    let shortfall = if !plan.is_empty() && !plan.fully_consumed {
        let allocated = plan.allocated_quantity();
        Some(Shortfall {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            requested: order.quantity,
            allocated,
            shortfall: order.quantity - allocated,
        })
    } else {
        None
    };

    (classify(order, &plan), shortfall)
}
