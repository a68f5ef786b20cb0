//! Header aliasing.
//!
//! Broker files and client order books name the same column differently
//! (`UCC` vs `order_id`, `Direction` vs `Buy/Sell Flag`, `QTY` vs
//! `Quantity`). Matching is case-insensitive with internal whitespace
//! collapsed; the first alias present in the header wins.

use std::collections::HashMap;

use csv::StringRecord;

use crate::IngestError;

#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// Canonical field name used in diagnostics.
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

pub const ID: Column = Column {
    field: "id",
    aliases: &["ucc", "id", "order_id", "trade_id", "client code", "client_code"],
};

pub const SYMBOL: Column = Column {
    field: "symbol",
    aliases: &["ticker", "symbol", "scrip", "scrip code"],
};

pub const SIDE: Column = Column {
    field: "side",
    aliases: &["direction", "side", "buy/sell flag", "buy/sell", "b/s"],
};

pub const DATE: Column = Column {
    field: "date",
    aliases: &["date", "trade_date", "trade date"],
};

pub const QUANTITY: Column = Column {
    field: "quantity",
    aliases: &["quantity", "qty"],
};

pub const BROKERAGE: Column = Column {
    field: "brokerage",
    aliases: &["brokerage amount", "brokerage", "brokerage_amount"],
};

pub const STT: Column = Column {
    field: "stt",
    aliases: &["stt"],
};

pub const NET_AMOUNT: Column = Column {
    field: "net_amount",
    aliases: &["net amount", "net_amount"],
};

pub const BROKER_CODE: Column = Column {
    field: "broker_code",
    aliases: &[
        "party code/sebi regn code of party",
        "broker_code",
        "broker code",
        "broker",
    ],
};

/// Lowercase, trim, strip a UTF-8 BOM and collapse runs of whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Case-insensitive header name → column position.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    idx: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_record(headers: &StringRecord) -> Self {
        let mut idx = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            // Keep the first occurrence of a duplicated header.
            idx.entry(normalize_header(h)).or_insert(i);
        }
        Self { idx }
    }

    pub fn find(&self, col: &Column) -> Option<usize> {
        col.aliases.iter().find_map(|a| self.idx.get(*a).copied())
    }

    pub fn require(&self, col: &Column, source: &str) -> Result<usize, IngestError> {
        self.find(col).ok_or_else(|| IngestError::MissingHeader {
            source: source.to_string(),
            column: col.field,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.idx.contains_key(&normalize_header(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_header_collapses_case_and_space() {
        assert_eq!(normalize_header("  Brokerage   Amount "), "brokerage amount");
        assert_eq!(normalize_header("\u{feff}UCC"), "ucc");
    }

    #[test]
    fn aliases_resolve() {
        let rec = StringRecord::from(vec!["UCC", "Ticker", "Buy/Sell Flag", "Date", "QTY"]);
        let h = HeaderIndex::from_record(&rec);
        assert_eq!(h.find(&ID), Some(0));
        assert_eq!(h.find(&SYMBOL), Some(1));
        assert_eq!(h.find(&SIDE), Some(2));
        assert_eq!(h.find(&QUANTITY), Some(4));
        assert_eq!(h.find(&STT), None);
    }

    #[test]
    fn require_reports_canonical_field() {
        let h = HeaderIndex::from_record(&StringRecord::from(vec!["UCC"]));
        let err = h.require(&NET_AMOUNT, "b1.csv").unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingHeader { column: "net_amount", .. }
        ));
    }
}
