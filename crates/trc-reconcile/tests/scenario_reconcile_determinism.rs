use chrono::NaiveDate;
use trc_reconcile::*;

fn fixture() -> (Vec<Order>, Vec<BrokerTrade>) {
    let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let symbols = ["INFY", "TCS", "WIPRO"];
    let mut orders = Vec::new();
    let mut trades = Vec::new();

    for (i, sym) in symbols.iter().enumerate() {
        for j in 0..4u64 {
            let side = if j % 2 == 0 { Side::Buy } else { Side::Sell };
            orders.push(Order::new(format!("C{i}{j}"), *sym, side, day, 25 + j * 10));
            trades.push(
                BrokerTrade::new(format!("T{i}{j}a"), *sym, side, day, 15 + j * 5).with_amounts(
                    Money::from_units(10 + j as i64),
                    Money::from_units(1),
                    Money::from_units(1_000 * (j as i64 + 1)),
                ),
            );
            trades.push(BrokerTrade::new(format!("T{i}{j}b"), *sym, side, day, 20));
        }
    }
    (orders, trades)
}

#[test]
fn scenario_reconcile_twice_is_identical() {
    let (orders, trades) = fixture();
    let a = reconcile(&orders, &trades);
    let b = reconcile(&orders, &trades);
    assert_eq!(a, b);
    assert!(!a.matched.is_empty());
}

#[test]
fn scenario_allocations_never_exceed_requested_quantity() {
    let (orders, trades) = fixture();
    let out = reconcile(&orders, &trades);

    for order in &orders {
        let allocated: u64 = out
            .matched
            .iter()
            .chain(out.excess.iter())
            .filter(|r| r.order_id == order.id)
            .map(|r| r.quantity)
            .sum();
        assert!(allocated <= order.quantity, "order {} over-allocated", order.id);

        let supply: u64 = trades
            .iter()
            .filter(|t| t.match_key() == order.match_key())
            .map(|t| t.quantity)
            .sum();
        if supply >= order.quantity {
            assert_eq!(allocated, order.quantity, "order {} under-allocated", order.id);
        }
    }
}

#[test]
fn scenario_results_follow_order_input_sequence() {
    let (orders, trades) = fixture();
    let out = reconcile(&orders, &trades);

    let position = |id: &str| orders.iter().position(|o| o.id == id).unwrap();
    let seq: Vec<usize> = out.matched.iter().map(|r| position(&r.order_id)).collect();
    let mut sorted = seq.clone();
    sorted.sort();
    assert_eq!(seq, sorted);
}

#[test]
fn scenario_slippage_is_net_over_allocated_quantity() {
    let (orders, trades) = fixture();
    let out = reconcile(&orders, &trades);

    for r in out.matched.iter().chain(out.excess.iter()) {
        let trade = trades.iter().find(|t| t.id == r.trade_id).unwrap();
        assert_eq!(r.slippage, trade.net_amount.div_qty(r.quantity));
        assert_eq!(r.total_cost, trade.brokerage.saturating_add(trade.stt));
    }
}
