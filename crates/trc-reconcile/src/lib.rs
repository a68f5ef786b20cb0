//! trc-reconcile
//!
//! Client-order vs broker-trade reconciliation for one trading day.
//!
//! Pipeline per order:
//! - MatchIndex lookup by (symbol, side, trade date), input order preserved
//! - greedy allocation of the order's quantity over its candidates
//! - cost attribution and classification into matched / excess / pending
//!
//! Deterministic, pure logic. No IO. Inputs arrive already normalized from
//! the ingest layer; outputs are handed to the result stores.

mod allocator;
mod classifier;
mod cost;
mod engine;
mod index;
mod money;
mod summary;
mod types;

pub use allocator::{allocate, AllocationPlan, TradeAllocation};
pub use classifier::{classify, ResultBucket};
pub use cost::{cost, CostBreakdown};
pub use engine::{reconcile, reconcile_order, ReconcileOutcome, ReconcileStats};
pub use index::MatchIndex;
pub use money::{Money, MICROS_SCALE};
pub use summary::{broker_summary, BrokerSummary, UNKNOWN_BROKER};
pub use types::*;
