use std::collections::HashMap;

use crate::types::{BrokerTrade, MatchKey, Order};

/// Broker trades grouped by `(symbol, side, trade_date)`.
///
/// Within a group, trades keep their input order; allocation walks them in
/// exactly that order, so the index must be rebuilt from the same sequence to
/// reproduce a run.
#[derive(Debug, Default)]
pub struct MatchIndex<'a> {
    groups: HashMap<MatchKey, Vec<&'a BrokerTrade>>,
    len: usize,
}

impl<'a> MatchIndex<'a> {
    pub fn build<I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'a BrokerTrade>,
    {
        let mut groups: HashMap<MatchKey, Vec<&'a BrokerTrade>> = HashMap::new();
        let mut len = 0;
        for trade in trades {
            groups.entry(trade.match_key()).or_default().push(trade);
            len += 1;
        }
        Self { groups, len }
    }

    /// Candidates for `order`, in input order. Empty when nothing matches.
    pub fn lookup(&self, order: &Order) -> &[&'a BrokerTrade] {
        self.get(&order.match_key())
    }

    pub fn get(&self, key: &MatchKey) -> &[&'a BrokerTrade] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of indexed trades.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn lookup_preserves_input_order_within_group() {
        let trades = vec![
            BrokerTrade::new("T1", "INFY", Side::Buy, day(31), 10),
            BrokerTrade::new("T2", "TCS", Side::Buy, day(31), 10),
            BrokerTrade::new("T3", "INFY", Side::Buy, day(31), 20),
            BrokerTrade::new("T4", "INFY", Side::Buy, day(31), 30),
        ];
        let index = MatchIndex::build(&trades);
        let order = Order::new("C1", "INFY", Side::Buy, day(31), 100);

        let ids: Vec<&str> = index.lookup(&order).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T3", "T4"]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.group_count(), 2);
    }

    #[test]
    fn side_and_date_are_part_of_the_key() {
        let trades = vec![
            BrokerTrade::new("T1", "INFY", Side::Sell, day(31), 10),
            BrokerTrade::new("T2", "INFY", Side::Buy, day(30), 10),
        ];
        let index = MatchIndex::build(&trades);
        let order = Order::new("C1", "INFY", Side::Buy, day(31), 10);
        assert!(index.lookup(&order).is_empty());
    }

    #[test]
    fn empty_index_returns_empty_slice() {
        let index = MatchIndex::build(std::iter::empty());
        let order = Order::new("C1", "INFY", Side::Buy, day(31), 10);
        assert!(index.lookup(&order).is_empty());
        assert!(index.is_empty());
    }
}
