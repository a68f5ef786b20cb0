//! Per-run export directory: `exports/<run_id>/` with one CSV per result
//! view and a `manifest.json` describing the run.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use trc_reconcile::{
    AllocationRecord, BrokerSummary, Diagnostic, PendingRecord, ReconcileOutcome, ReconcileStats,
    Shortfall,
};

pub const MANIFEST_SCHEMA_VERSION: i32 = 1;

pub const MATCHED_CSV: &str = "matched.csv";
pub const EXCESS_CSV: &str = "excess.csv";
pub const PENDING_CSV: &str = "pending.csv";
pub const SHORTFALLS_CSV: &str = "shortfalls.csv";
pub const DIAGNOSTICS_CSV: &str = "diagnostics.csv";
pub const BROKER_SUMMARY_CSV: &str = "broker_summary.csv";
pub const MANIFEST_JSON: &str = "manifest.json";

const ALLOCATION_HEADER: &[&str] = &[
    "order_id",
    "trade_id",
    "symbol",
    "quantity",
    "status",
    "brokerage_cost",
    "stt",
    "total_cost",
    "slippage",
    "generated_at",
];
const PENDING_HEADER: &[&str] = &["order_id", "symbol", "quantity", "status", "generated_at"];
const SHORTFALL_HEADER: &[&str] = &[
    "order_id",
    "symbol",
    "requested",
    "allocated",
    "shortfall",
    "generated_at",
];
const DIAGNOSTIC_HEADER: &[&str] = &["record", "origin", "error", "generated_at"];
const BROKER_SUMMARY_HEADER: &[&str] = &[
    "broker_code",
    "total_trades",
    "total_quantity",
    "total_brokerage",
    "total_stt",
    "total_cost",
    "generated_at",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub config_hash: String,
    pub trade_date: Option<NaiveDate>,
    pub created_at_utc: DateTime<Utc>,
    pub counts: ReconcileStats,
    pub broker_count: usize,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub matched_csv: String,
    pub excess_csv: String,
    pub pending_csv: String,
    pub shortfalls_csv: String,
    pub diagnostics_csv: String,
    pub broker_summary_csv: String,
    pub manifest_json: String,
}

impl Default for ArtifactList {
    fn default() -> Self {
        Self {
            matched_csv: MATCHED_CSV.to_string(),
            excess_csv: EXCESS_CSV.to_string(),
            pending_csv: PENDING_CSV.to_string(),
            shortfalls_csv: SHORTFALLS_CSV.to_string(),
            diagnostics_csv: DIAGNOSTICS_CSV.to_string(),
            broker_summary_csv: BROKER_SUMMARY_CSV.to_string(),
            manifest_json: MANIFEST_JSON.to_string(),
        }
    }
}

pub struct WriteRunExportsArgs<'a> {
    pub exports_root: &'a Path, // e.g. ./exports
    pub run_id: Uuid,
    pub config_hash: &'a str,
    pub trade_date: Option<NaiveDate>,
    pub generated_at: DateTime<Utc>,
}

pub struct RunExports {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
}

// Rows as written to disk. Money renders through its Display impl.

#[derive(Serialize)]
struct AllocationRow<'a> {
    order_id: &'a str,
    trade_id: &'a str,
    symbol: &'a str,
    quantity: u64,
    status: &'static str,
    brokerage_cost: String,
    stt: String,
    total_cost: String,
    slippage: String,
    generated_at: &'a str,
}

impl<'a> AllocationRow<'a> {
    fn new(r: &'a AllocationRecord, generated_at: &'a str) -> Self {
        Self {
            order_id: &r.order_id,
            trade_id: &r.trade_id,
            symbol: &r.symbol,
            quantity: r.quantity,
            status: r.status.as_str(),
            brokerage_cost: r.brokerage_cost.to_string(),
            stt: r.stt.to_string(),
            total_cost: r.total_cost.to_string(),
            slippage: r.slippage.to_string(),
            generated_at,
        }
    }
}

#[derive(Serialize)]
struct PendingRow<'a> {
    order_id: &'a str,
    symbol: &'a str,
    quantity: u64,
    status: &'static str,
    generated_at: &'a str,
}

#[derive(Serialize)]
struct ShortfallRow<'a> {
    order_id: &'a str,
    symbol: &'a str,
    requested: u64,
    allocated: u64,
    shortfall: u64,
    generated_at: &'a str,
}

#[derive(Serialize)]
struct DiagnosticRow<'a> {
    record: &'static str,
    origin: &'a str,
    error: String,
    generated_at: &'a str,
}

#[derive(Serialize)]
struct BrokerSummaryRow<'a> {
    broker_code: &'a str,
    total_trades: usize,
    total_quantity: u64,
    total_brokerage: String,
    total_stt: String,
    total_cost: String,
    generated_at: &'a str,
}

/// Write every result view plus the manifest into `exports_root/<run_id>/`.
///
/// Files are overwritten if the directory already exists. Each CSV always
/// has a header row, even when the view is empty.
pub fn write_run_exports(
    args: WriteRunExportsArgs<'_>,
    outcome: &ReconcileOutcome,
    brokers: &[BrokerSummary],
) -> Result<RunExports> {
    let run_dir = args.exports_root.join(args.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create exports dir failed: {}", run_dir.display()))?;

    let ts = args.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let ts = ts.as_str();

    write_allocations(&run_dir.join(MATCHED_CSV), &outcome.matched, ts)?;
    write_allocations(&run_dir.join(EXCESS_CSV), &outcome.excess, ts)?;
    write_pending(&run_dir.join(PENDING_CSV), &outcome.pending, ts)?;
    write_shortfalls(&run_dir.join(SHORTFALLS_CSV), &outcome.shortfalls, ts)?;
    write_diagnostics(&run_dir.join(DIAGNOSTICS_CSV), &outcome.diagnostics, ts)?;
    write_broker_summary(&run_dir.join(BROKER_SUMMARY_CSV), brokers, ts)?;

    let manifest = RunManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        run_id: args.run_id,
        config_hash: args.config_hash.to_string(),
        trade_date: args.trade_date,
        created_at_utc: args.generated_at,
        counts: outcome.stats(),
        broker_count: brokers.len(),
        artifacts: ArtifactList::default(),
    };

    let manifest_path = run_dir.join(MANIFEST_JSON);
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest failed")?;
    fs::write(&manifest_path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", manifest_path.display()))?;

    info!(run_id = %args.run_id, dir = %run_dir.display(), "run exports written");
    Ok(RunExports {
        run_dir,
        manifest_path,
    })
}

/// Read back a manifest written by [`write_run_exports`].
pub fn read_manifest(run_dir: &Path) -> Result<RunManifest> {
    let path = run_dir.join(MANIFEST_JSON);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse manifest failed: {}", path.display()))
}

fn write_rows<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<()> {
    let mut w = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("create csv failed: {}", path.display()))?;
    w.write_record(header)
        .with_context(|| format!("write csv header failed: {}", path.display()))?;
    for row in rows {
        w.serialize(row)
            .with_context(|| format!("write csv row failed: {}", path.display()))?;
    }
    w.flush()
        .with_context(|| format!("flush csv failed: {}", path.display()))?;
    Ok(())
}

fn write_allocations(path: &Path, records: &[AllocationRecord], ts: &str) -> Result<()> {
    write_rows(
        path,
        ALLOCATION_HEADER,
        records.iter().map(|r| AllocationRow::new(r, ts)),
    )
}

fn write_pending(path: &Path, records: &[PendingRecord], ts: &str) -> Result<()> {
    write_rows(
        path,
        PENDING_HEADER,
        records.iter().map(|r| PendingRow {
            order_id: &r.order_id,
            symbol: &r.symbol,
            quantity: r.quantity,
            status: r.status.as_str(),
            generated_at: ts,
        }),
    )
}

fn write_shortfalls(path: &Path, records: &[Shortfall], ts: &str) -> Result<()> {
    write_rows(
        path,
        SHORTFALL_HEADER,
        records.iter().map(|s| ShortfallRow {
            order_id: &s.order_id,
            symbol: &s.symbol,
            requested: s.requested,
            allocated: s.allocated,
            shortfall: s.shortfall,
            generated_at: ts,
        }),
    )
}

fn write_diagnostics(path: &Path, records: &[Diagnostic], ts: &str) -> Result<()> {
    write_rows(
        path,
        DIAGNOSTIC_HEADER,
        records.iter().map(|d| DiagnosticRow {
            record: d.record.as_str(),
            origin: &d.origin,
            error: d.error.to_string(),
            generated_at: ts,
        }),
    )
}

fn write_broker_summary(path: &Path, brokers: &[BrokerSummary], ts: &str) -> Result<()> {
    write_rows(
        path,
        BROKER_SUMMARY_HEADER,
        brokers.iter().map(|b| BrokerSummaryRow {
            broker_code: &b.broker_code,
            total_trades: b.total_trades,
            total_quantity: b.total_quantity,
            total_brokerage: b.total_brokerage.to_string(),
            total_stt: b.total_stt.to_string(),
            total_cost: b.total_cost.to_string(),
            generated_at: ts,
        }),
    )
}
