use chrono::NaiveDate;
use trc_reconcile::*;

#[test]
fn scenario_no_candidates_yields_exactly_one_pending() {
    let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let next = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

    let orders = vec![
        Order::new("C1", "SBIN", Side::Buy, day, 10),
        Order::new("C2", "SBIN", Side::Sell, day, 10),
    ];
    // Same symbol, but wrong side for C2 and wrong date for C1.
    let trades = vec![
        BrokerTrade::new("T1", "SBIN", Side::Buy, next, 10),
        BrokerTrade::new("T2", "SBIN", Side::Buy, next, 10),
    ];

    let out = reconcile(&orders, &trades);
    assert!(out.matched.is_empty());
    assert!(out.excess.is_empty());

    let pending: Vec<(&str, &str, u64, ResultStatus)> = out
        .pending
        .iter()
        .map(|p| (p.order_id.as_str(), p.symbol.as_str(), p.quantity, p.status))
        .collect();
    assert_eq!(
        pending,
        vec![
            ("C1", "SBIN", 10, ResultStatus::Pending),
            ("C2", "SBIN", 10, ResultStatus::Pending),
        ]
    );
}
