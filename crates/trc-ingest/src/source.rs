use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;
use trc_reconcile::{BrokerTrade, Diagnostic, Order};

use crate::csv_source::{read_orders_file, read_trades_file};
use crate::detect::{sniff_file, FileKind};
use crate::eml::read_email_file;
use crate::IngestError;

/// Which files to read for one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct SourceSpec {
    pub orders: Vec<PathBuf>,
    pub trades: Vec<PathBuf>,
    /// Files whose kind is decided by [`crate::identify_file_kind`].
    pub auto_detect: Vec<PathBuf>,
    /// `.eml` messages whose spreadsheet or CSV attachments are classified
    /// and decoded individually.
    pub emails: Vec<PathBuf>,
    /// When set, records dated otherwise are dropped.
    pub trade_date: Option<NaiveDate>,
}

/// Everything the core needs for one run, already normalized.
#[derive(Debug, Clone, Default)]
pub struct TradeSnapshot {
    pub orders: Vec<Order>,
    pub trades: Vec<BrokerTrade>,
    pub diagnostics: Vec<Diagnostic>,
    /// Records dropped by the trade-date filter.
    pub out_of_date: usize,
    /// Attachments are listed as `<message path>#<attachment name>`.
    pub files_read: Vec<(PathBuf, FileKind)>,
}

/// Load a [`TradeSnapshot`]. Any unreadable file or missing header fails the
/// whole load before reconciliation starts.
///
/// Explicit order files come first, then explicit trade files, then
/// auto-detected files, then e-mail attachments in message order.
pub fn load_snapshot(sources: &SourceSpec) -> Result<TradeSnapshot, IngestError> {
    let mut plan: Vec<(PathBuf, FileKind)> = Vec::new();
    plan.extend(sources.orders.iter().map(|p| (p.clone(), FileKind::ClientOrders)));
    plan.extend(sources.trades.iter().map(|p| (p.clone(), FileKind::BrokerTrades)));
    for p in &sources.auto_detect {
        plan.push((p.clone(), sniff_file(p)?));
    }

    let mut snap = TradeSnapshot::default();
    for (path, kind) in plan {
        load_file(&path, kind, &mut snap)?;
        snap.files_read.push((path, kind));
    }
    for path in &sources.emails {
        let batch = read_email_file(path)?;
        snap.orders.extend(batch.orders.records);
        snap.diagnostics.extend(batch.orders.diagnostics);
        snap.trades.extend(batch.trades.records);
        snap.diagnostics.extend(batch.trades.diagnostics);
        snap.files_read.extend(
            batch
                .attachments
                .into_iter()
                .map(|(origin, kind)| (PathBuf::from(origin), kind)),
        );
    }

    if let Some(day) = sources.trade_date {
        let before = snap.orders.len() + snap.trades.len();
        snap.orders.retain(|o| o.trade_date == day);
        snap.trades.retain(|t| t.trade_date == day);
        snap.out_of_date = before - (snap.orders.len() + snap.trades.len());
    }

    info!(
        files = snap.files_read.len(),
        orders = snap.orders.len(),
        trades = snap.trades.len(),
        rejected = snap.diagnostics.len(),
        out_of_date = snap.out_of_date,
        "trade snapshot loaded"
    );
    Ok(snap)
}

fn load_file(path: &Path, kind: FileKind, snap: &mut TradeSnapshot) -> Result<(), IngestError> {
    match kind {
        FileKind::ClientOrders => {
            let batch = read_orders_file(path)?;
            snap.orders.extend(batch.records);
            snap.diagnostics.extend(batch.diagnostics);
        }
        FileKind::BrokerTrades => {
            let batch = read_trades_file(path)?;
            snap.trades.extend(batch.records);
            snap.diagnostics.extend(batch.diagnostics);
        }
    }
    Ok(())
}
