use chrono::NaiveDate;
use trc_reconcile::*;

#[test]
fn scenario_zero_quantity_order_with_candidates_allocates_nothing() {
    let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let orders = vec![Order::new("C1", "ITC", Side::Buy, day, 0)];
    let trades = vec![BrokerTrade::new("T1", "ITC", Side::Buy, day, 100)];

    let out = reconcile(&orders, &trades);
    assert!(out.matched.is_empty());
    assert!(out.excess.is_empty());
    assert!(out.pending.is_empty());
    assert!(out.shortfalls.is_empty());
    assert_eq!(out.orders_processed, 1);
}

#[test]
fn scenario_zero_quantity_order_without_candidates_is_pending() {
    let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let orders = vec![Order::new("C1", "ITC", Side::Buy, day, 0)];

    let out = reconcile(&orders, &[]);
    assert_eq!(out.pending.len(), 1);
    assert_eq!(out.pending[0].quantity, 0);
}
