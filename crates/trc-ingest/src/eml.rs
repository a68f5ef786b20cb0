//! Trade files delivered as e-mail attachments.
//!
//! Brokers mail their day's trade file; the desk sometimes receives the
//! client order book the same way. Each `.eml` is searched for spreadsheet
//! (`.xlsx`, `.xlsm`, `.xls`) and `.csv` attachments. Only the first
//! worksheet of a workbook is read and its first row is the header.
//! Every attachment is classified with [`identify_file_kind`] and decoded
//! through the same column rules as a CSV export.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Days, NaiveDate};
use csv::StringRecord;
use mail_parser::{MessageParser, MimeHeaders};
use tracing::{debug, warn};
use trc_reconcile::{BrokerTrade, Order};

use crate::columns::HeaderIndex;
use crate::csv_source::{decode_orders, decode_trades};
use crate::detect::{identify_file_kind, FileKind};
use crate::{IngestBatch, IngestError};

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// Everything decoded from one e-mail.
#[derive(Debug, Clone, Default)]
pub struct EmailBatch {
    /// `<source>#<attachment name>` and its kind, in message order.
    pub attachments: Vec<(String, FileKind)>,
    pub orders: IngestBatch<Order>,
    pub trades: IngestBatch<BrokerTrade>,
}

pub fn read_email_file(path: &Path) -> Result<EmailBatch, IngestError> {
    let raw = fs::read(path)
        .map_err(|e| IngestError::Io(format!("read '{}': {e}", path.display())))?;
    parse_email(&raw, &path.display().to_string())
}

/// Decode every usable attachment of a raw RFC 5322 message.
///
/// A message without usable attachments yields an empty batch. An
/// attachment that cannot be opened as a workbook, or that lacks a
/// required column, fails the whole message.
pub fn parse_email(raw: &[u8], source: &str) -> Result<EmailBatch, IngestError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| IngestError::Email(format!("{source}: not a MIME message")))?;

    let mut batch = EmailBatch::default();
    for part in message.attachments() {
        let Some(name) = part.attachment_name() else {
            continue;
        };
        let Some(format) = AttachmentFormat::from_name(name) else {
            debug!(%source, attachment = name, "attachment ignored");
            continue;
        };

        let origin = format!("{source}#{name}");
        let table = Table::read(format, part.contents(), &origin)?;
        let kind = identify_file_kind(name, &HeaderIndex::from_record(&table.headers));
        debug!(%origin, %kind, rows = table.rows.len(), "attachment identified");

        let rows = table.rows.into_iter().map(Ok);
        match kind {
            FileKind::ClientOrders => {
                let b = decode_orders(&table.headers, rows, &origin)?;
                batch.orders.records.extend(b.records);
                batch.orders.diagnostics.extend(b.diagnostics);
            }
            FileKind::BrokerTrades => {
                let b = decode_trades(&table.headers, rows, &origin)?;
                batch.trades.records.extend(b.records);
                batch.trades.diagnostics.extend(b.diagnostics);
            }
        }
        batch.attachments.push((origin, kind));
    }

    if batch.attachments.is_empty() {
        warn!(%source, "no order or trade attachments found");
    }
    Ok(batch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachmentFormat {
    Csv,
    Spreadsheet,
}

impl AttachmentFormat {
    fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()?
            .to_string_lossy()
            .to_ascii_lowercase();
        if ext == "csv" {
            Some(AttachmentFormat::Csv)
        } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            Some(AttachmentFormat::Spreadsheet)
        } else {
            None
        }
    }
}

/// Header row plus data rows of one attachment, as text.
struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read(format: AttachmentFormat, bytes: &[u8], origin: &str) -> Result<Self, IngestError> {
        match format {
            AttachmentFormat::Csv => Self::from_csv(bytes, origin),
            AttachmentFormat::Spreadsheet => Self::from_workbook(bytes, origin),
        }
    }

    fn from_csv(bytes: &[u8], origin: &str) -> Result<Self, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);
        let csv_err = |e: csv::Error| IngestError::Csv(format!("{origin}: {e}"));
        let headers = rdr.headers().map_err(csv_err)?.clone();
        let rows = rdr
            .into_records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;
        Ok(Table { headers, rows })
    }

    fn from_workbook(bytes: &[u8], origin: &str) -> Result<Self, IngestError> {
        let sheet_err = |e: calamine::Error| IngestError::Spreadsheet(format!("{origin}: {e}"));
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(sheet_err)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::Spreadsheet(format!("{origin}: workbook has no sheets")))?
            .map_err(sheet_err)?;

        let mut rows = range
            .rows()
            .map(|cells| cells.iter().map(cell_text).collect::<StringRecord>());
        let headers = rows.next().unwrap_or_default();
        Ok(Table {
            headers,
            rows: rows.collect(),
        })
    }
}

/// Render a worksheet cell the way a CSV export of the sheet would read.
///
/// Whole-number floats lose their fraction (spreadsheets store every number
/// as a float); other floats are rounded to micro precision. Date cells are
/// rendered as `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => format!("{f:.6}"),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match excel_serial_date(dt.as_f64()) {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}

/// Calendar date of an Excel 1900-system serial number (day 0 is 1899-12-30).
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.trunc() as u64))
}
