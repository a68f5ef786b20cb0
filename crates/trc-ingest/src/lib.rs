//! trc-ingest
//!
//! Trade source for reconciliation: reads client-order and broker-trade
//! CSV exports and e-mailed spreadsheet attachments, resolves column aliases, normalizes sides, dates, quantities
//! and amounts, and hands strongly-typed records to `trc-reconcile`.
//!
//! Fatal problems (unreadable file, missing header) are [`IngestError`]s.
//! Row problems are [`trc_reconcile::Diagnostic`]s and do not stop the load.

pub mod columns;
pub mod csv_source;
pub mod detect;
pub mod eml;
pub mod normalize;
pub mod source;

use std::fmt;

use trc_reconcile::Diagnostic;

pub use csv_source::{
    parse_orders, parse_orders_str, parse_trades, parse_trades_str, read_header_index,
    read_orders_file, read_trades_file,
};
pub use detect::{identify_file_kind, sniff_file, FileKind};
pub use eml::{parse_email, read_email_file, EmailBatch};
pub use source::{load_snapshot, SourceSpec, TradeSnapshot};

/// Decoded records from one input plus the rows that were rejected.
#[derive(Debug, Clone)]
pub struct IngestBatch<T> {
    pub records: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Default for IngestBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Errors that abort ingestion of a file.
#[derive(Debug)]
pub enum IngestError {
    /// The file could not be opened or read.
    Io(String),
    /// The CSV reader failed (bad UTF-8, malformed quoting).
    Csv(String),
    /// A required column is absent from the header row.
    MissingHeader { source: String, column: &'static str },
    /// The message is not a parseable e-mail.
    Email(String),
    /// A spreadsheet attachment could not be opened or has no sheets.
    Spreadsheet(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "ingest io error: {msg}"),
            IngestError::Csv(msg) => write!(f, "ingest csv error: {msg}"),
            IngestError::MissingHeader { source, column } => {
                write!(f, "{source}: missing required header column '{column}'")
            }
            IngestError::Email(msg) => write!(f, "ingest email error: {msg}"),
            IngestError::Spreadsheet(msg) => write!(f, "ingest spreadsheet error: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}
