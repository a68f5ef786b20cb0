//! CSV decoding for client orders and broker trades.
//!
//! Header problems are structural and fail the whole file. Row problems
//! (blank required cell, negative quantity, unknown side, bad date or
//! amount) skip that row and are returned as diagnostics alongside the
//! decoded records.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};
use trc_reconcile::{BrokerTrade, DataError, Diagnostic, Order, RecordKind};

use crate::columns::{
    HeaderIndex, BROKERAGE, BROKER_CODE, DATE, ID, NET_AMOUNT, QUANTITY, SIDE, STT, SYMBOL,
};
use crate::normalize;
use crate::{IngestBatch, IngestError};

/// Column positions for a client-order file, resolved once per file.
struct OrderLayout {
    id: usize,
    symbol: usize,
    side: usize,
    date: usize,
    quantity: usize,
}

struct TradeLayout {
    id: usize,
    symbol: usize,
    side: usize,
    date: usize,
    quantity: usize,
    brokerage: usize,
    stt: usize,
    net_amount: usize,
    broker_code: Option<usize>,
}

fn cell<'r>(rec: &'r StringRecord, i: usize) -> &'r str {
    rec.get(i).unwrap_or("")
}

fn is_blank(rec: &StringRecord) -> bool {
    rec.iter().all(|f| f.trim().is_empty())
}

fn reader<R: Read>(src: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(src)
}

fn csv_err(source: &str, e: csv::Error) -> IngestError {
    IngestError::Csv(format!("{source}: {e}"))
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|e| IngestError::Io(format!("open '{}': {e}", path.display())))
}

/// Header row of `path` as a [`HeaderIndex`].
pub fn read_header_index(path: &Path) -> Result<HeaderIndex, IngestError> {
    let source = path.display().to_string();
    let mut rdr = reader(open(path)?);
    let headers = rdr.headers().map_err(|e| csv_err(&source, e))?;
    Ok(HeaderIndex::from_record(headers))
}

// ---------------------------------------------------------------------------
// Client orders
// ---------------------------------------------------------------------------

pub fn read_orders_file(path: &Path) -> Result<IngestBatch<Order>, IngestError> {
    parse_orders(open(path)?, &path.display().to_string())
}

pub fn parse_orders_str(src: &str, source: &str) -> Result<IngestBatch<Order>, IngestError> {
    parse_orders(src.as_bytes(), source)
}

pub fn parse_orders<R: Read>(src: R, source: &str) -> Result<IngestBatch<Order>, IngestError> {
    let mut rdr = reader(src);
    let headers = rdr.headers().map_err(|e| csv_err(source, e))?.clone();
    let rows = rdr.into_records().map(|r| r.map_err(|e| csv_err(source, e)));
    decode_orders(&headers, rows, source)
}

/// Decode order rows that follow `headers`. Shared by the CSV reader and
/// spreadsheet attachments.
pub(crate) fn decode_orders<I>(
    headers: &StringRecord,
    rows: I,
    source: &str,
) -> Result<IngestBatch<Order>, IngestError>
where
    I: IntoIterator<Item = Result<StringRecord, IngestError>>,
{
    let headers = HeaderIndex::from_record(headers);
    let layout = OrderLayout {
        id: headers.require(&ID, source)?,
        symbol: headers.require(&SYMBOL, source)?,
        side: headers.require(&SIDE, source)?,
        date: headers.require(&DATE, source)?,
        quantity: headers.require(&QUANTITY, source)?,
    };

    let mut batch = IngestBatch::default();
    for (i, rec) in rows.into_iter().enumerate() {
        let rec = rec?;
        if is_blank(&rec) {
            continue;
        }
        let row = i + 1;
        match decode_order(&rec, &layout) {
            Ok(order) => batch.records.push(order),
            Err(error) => {
                warn!(%source, row, %error, "order row skipped");
                batch.diagnostics.push(Diagnostic::new(
                    RecordKind::Order,
                    format!("{source} row {row}"),
                    error,
                ));
            }
        }
    }

    debug!(
        %source,
        orders = batch.records.len(),
        rejected = batch.diagnostics.len(),
        "orders decoded"
    );
    Ok(batch)
}

fn decode_order(rec: &StringRecord, l: &OrderLayout) -> Result<Order, DataError> {
    Ok(Order {
        id: normalize::text(cell(rec, l.id), ID.field)?,
        symbol: normalize::text(cell(rec, l.symbol), SYMBOL.field)?.to_ascii_uppercase(),
        side: normalize::side(cell(rec, l.side), SIDE.field)?,
        trade_date: normalize::date(cell(rec, l.date), DATE.field)?,
        quantity: normalize::quantity(cell(rec, l.quantity), QUANTITY.field)?,
    })
}

// ---------------------------------------------------------------------------
// Broker trades
// ---------------------------------------------------------------------------

pub fn read_trades_file(path: &Path) -> Result<IngestBatch<BrokerTrade>, IngestError> {
    parse_trades(open(path)?, &path.display().to_string())
}

pub fn parse_trades_str(src: &str, source: &str) -> Result<IngestBatch<BrokerTrade>, IngestError> {
    parse_trades(src.as_bytes(), source)
}

pub fn parse_trades<R: Read>(
    src: R,
    source: &str,
) -> Result<IngestBatch<BrokerTrade>, IngestError> {
    let mut rdr = reader(src);
    let headers = rdr.headers().map_err(|e| csv_err(source, e))?.clone();
    let rows = rdr.into_records().map(|r| r.map_err(|e| csv_err(source, e)));
    decode_trades(&headers, rows, source)
}

pub(crate) fn decode_trades<I>(
    headers: &StringRecord,
    rows: I,
    source: &str,
) -> Result<IngestBatch<BrokerTrade>, IngestError>
where
    I: IntoIterator<Item = Result<StringRecord, IngestError>>,
{
    let headers = HeaderIndex::from_record(headers);
    let layout = TradeLayout {
        id: headers.require(&ID, source)?,
        symbol: headers.require(&SYMBOL, source)?,
        side: headers.require(&SIDE, source)?,
        date: headers.require(&DATE, source)?,
        quantity: headers.require(&QUANTITY, source)?,
        brokerage: headers.require(&BROKERAGE, source)?,
        stt: headers.require(&STT, source)?,
        net_amount: headers.require(&NET_AMOUNT, source)?,
        broker_code: headers.find(&BROKER_CODE),
    };

    let mut batch = IngestBatch::default();
    for (i, rec) in rows.into_iter().enumerate() {
        let rec = rec?;
        if is_blank(&rec) {
            continue;
        }
        let row = i + 1;
        match decode_trade(&rec, &layout) {
            Ok(trade) => batch.records.push(trade),
            Err(error) => {
                warn!(%source, row, %error, "trade row skipped");
                batch.diagnostics.push(Diagnostic::new(
                    RecordKind::Trade,
                    format!("{source} row {row}"),
                    error,
                ));
            }
        }
    }

    debug!(
        %source,
        trades = batch.records.len(),
        rejected = batch.diagnostics.len(),
        "trades decoded"
    );
    Ok(batch)
}

fn decode_trade(rec: &StringRecord, l: &TradeLayout) -> Result<BrokerTrade, DataError> {
    let broker_code = l
        .broker_code
        .map(|i| cell(rec, i).trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(BrokerTrade {
        id: normalize::text(cell(rec, l.id), ID.field)?,
        symbol: normalize::text(cell(rec, l.symbol), SYMBOL.field)?.to_ascii_uppercase(),
        side: normalize::side(cell(rec, l.side), SIDE.field)?,
        trade_date: normalize::date(cell(rec, l.date), DATE.field)?,
        quantity: normalize::quantity(cell(rec, l.quantity), QUANTITY.field)?,
        brokerage: normalize::amount(cell(rec, l.brokerage), BROKERAGE.field)?,
        stt: normalize::amount(cell(rec, l.stt), STT.field)?,
        net_amount: normalize::amount(cell(rec, l.net_amount), NET_AMOUNT.field)?,
        broker_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use trc_reconcile::{Money, Side};

    const ORDERS_HEADER: &str = "UCC,Ticker,Direction,Date,Quantity";
    const TRADES_HEADER: &str =
        "UCC,Ticker,Buy/Sell Flag,Date,QTY,Brokerage Amount,STT,Net Amount,party code/SEBI regn code of party";

    #[test]
    fn header_only_returns_empty_batch() {
        let b = parse_orders_str(ORDERS_HEADER, "o.csv").unwrap();
        assert!(b.records.is_empty());
        assert!(b.diagnostics.is_empty());
    }

    #[test]
    fn missing_required_header_is_fatal() {
        let err = parse_orders_str("UCC,Ticker,Date,Quantity\nC1,INFY,2025-01-31,10", "o.csv")
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingHeader { column: "side", .. }));

        let err = parse_trades_str(ORDERS_HEADER, "t.csv").unwrap_err();
        assert!(matches!(err, IngestError::MissingHeader { column: "brokerage", .. }));
    }

    #[test]
    fn orders_decode_and_normalize() {
        let csv = format!("{ORDERS_HEADER}\nC1, infy ,B,31-01-2025,100\nC2,TCS,Sell,2025-01-31,5.0");
        let b = parse_orders_str(&csv, "o.csv").unwrap();
        assert_eq!(b.records.len(), 2);
        let o = &b.records[0];
        assert_eq!(o.id, "C1");
        assert_eq!(o.symbol, "INFY");
        assert_eq!(o.side, Side::Buy);
        assert_eq!(o.trade_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(o.quantity, 100);
        assert_eq!(b.records[1].quantity, 5);
    }

    #[test]
    fn bad_rows_become_diagnostics() {
        let csv = format!(
            "{ORDERS_HEADER}\n,INFY,B,2025-01-31,10\nC2,INFY,B,2025-01-31,-3\nC3,INFY,X,2025-01-31,1\nC4,INFY,S,2025-01-31,7"
        );
        let b = parse_orders_str(&csv, "o.csv").unwrap();
        assert_eq!(b.records.len(), 1);
        assert_eq!(b.records[0].id, "C4");

        let errs: Vec<(&str, &DataError)> = b
            .diagnostics
            .iter()
            .map(|d| (d.origin.as_str(), &d.error))
            .collect();
        assert_eq!(
            errs,
            vec![
                ("o.csv row 1", &DataError::MissingField { field: "id" }),
                ("o.csv row 2", &DataError::InvalidQuantity { raw: "-3".into() }),
                (
                    "o.csv row 3",
                    &DataError::InvalidField {
                        field: "side",
                        raw: "X".into()
                    }
                ),
            ]
        );
    }

    #[test]
    fn blank_rows_are_ignored() {
        let csv = format!("{ORDERS_HEADER}\n,,,,\nC1,INFY,B,2025-01-31,10\n");
        let b = parse_orders_str(&csv, "o.csv").unwrap();
        assert_eq!(b.records.len(), 1);
        assert!(b.diagnostics.is_empty());
    }

    #[test]
    fn trades_decode_amounts_and_broker_code() {
        let csv = format!(
            "{TRADES_HEADER}\nT1,INFY,BUY,2025-01-31,60,20.50,\"1,234.25\",-90000.00,INZ000031633\nT2,INFY,BUY,2025-01-31,40,1,2,3,"
        );
        let b = parse_trades_str(&csv, "t.csv").unwrap();
        assert_eq!(b.records.len(), 2);
        let t = &b.records[0];
        assert_eq!(t.quantity, 60);
        assert_eq!(t.brokerage, Money::new(20_500_000));
        assert_eq!(t.stt, Money::new(1_234_250_000));
        assert_eq!(t.net_amount, Money::from_units(-90_000));
        assert_eq!(t.broker_code.as_deref(), Some("INZ000031633"));
        assert_eq!(b.records[1].broker_code, None);
    }

    #[test]
    fn trade_with_bad_amount_is_skipped() {
        let csv = format!("{TRADES_HEADER}\nT1,INFY,BUY,2025-01-31,60,abc,1,1,");
        let b = parse_trades_str(&csv, "t.csv").unwrap();
        assert!(b.records.is_empty());
        assert_eq!(b.diagnostics[0].record, RecordKind::Trade);
        assert_eq!(
            b.diagnostics[0].error,
            DataError::InvalidField {
                field: "brokerage",
                raw: "abc".into()
            }
        );
    }
}
