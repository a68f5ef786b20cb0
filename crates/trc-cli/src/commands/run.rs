//! `trc run`: the full reconciliation pipeline for one trading day.
//!
//! Command-line inputs become one more config layer on top of the files
//! given with `--config`, so the recorded hash covers the effective
//! configuration of the run.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use trc_artifacts::WriteRunExportsArgs;
use trc_config::{LoadedConfig, ReconConfig};
use trc_ingest::{load_snapshot, SourceSpec};
use trc_reconcile::{broker_summary, reconcile, ReconcileStats};

use super::read_layers;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Layered config paths in merge order
    #[arg(long = "config")]
    pub config_paths: Vec<PathBuf>,

    /// Client order files (replaces inputs.orders)
    #[arg(long)]
    pub orders: Vec<PathBuf>,

    /// Broker trade files (replaces inputs.trades)
    #[arg(long)]
    pub trades: Vec<PathBuf>,

    /// Files classified by name and header (replaces inputs.auto_detect)
    #[arg(long = "input")]
    pub inputs: Vec<PathBuf>,

    /// E-mails with order/trade attachments (replaces inputs.emails)
    #[arg(long = "email")]
    pub emails: Vec<PathBuf>,

    /// Only reconcile records on this date (YYYY-MM-DD)
    #[arg(long)]
    pub trade_date: Option<NaiveDate>,

    /// Root directory for run exports
    #[arg(long)]
    pub exports_root: Option<PathBuf>,

    /// SQLite file to persist the run into
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub config_hash: String,
    pub trade_date: Option<NaiveDate>,
    pub files_read: usize,
    pub orders: usize,
    pub trades: usize,
    pub out_of_date: usize,
    pub stats: ReconcileStats,
    pub run_dir: PathBuf,
    pub db_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn print(&self) {
        println!("run_id={}", self.run_id);
        println!("config_hash={}", self.config_hash);
        println!(
            "trade_date={}",
            self.trade_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "ALL".to_string())
        );
        println!("files_read={}", self.files_read);
        println!("orders={}", self.orders);
        println!("trades={}", self.trades);
        println!("out_of_date={}", self.out_of_date);
        println!("orders_processed={}", self.stats.orders_processed);
        println!("matched={}", self.stats.matched);
        println!("excess={}", self.stats.excess);
        println!("pending={}", self.stats.pending);
        println!("shortfalls={}", self.stats.shortfalls);
        println!("diagnostics={}", self.stats.diagnostics);
        println!("exports_dir={}", self.run_dir.display());
        match &self.db_path {
            Some(p) => println!("db_saved=true db={}", p.display()),
            None => println!("db_saved=false"),
        }
    }
}

pub async fn execute(args: RunArgs) -> Result<RunSummary> {
    let loaded = effective_config(&args)?;
    let cfg: ReconConfig = loaded.recon()?;

    let sources = SourceSpec {
        orders: cfg.inputs.orders.clone(),
        trades: cfg.inputs.trades.clone(),
        auto_detect: cfg.inputs.auto_detect.clone(),
        emails: cfg.inputs.emails.clone(),
        trade_date: cfg.trade_date,
    };
    if sources.orders.is_empty()
        && sources.trades.is_empty()
        && sources.auto_detect.is_empty()
        && sources.emails.is_empty()
    {
        bail!("no input files: pass --orders/--trades/--input/--email or set inputs in config");
    }

    let snap = load_snapshot(&sources).context("ingest failed")?;

    let mut outcome = reconcile(&snap.orders, &snap.trades);
    // Row-level ingest rejects come first, then records the core refused.
    let mut diagnostics = snap.diagnostics.clone();
    diagnostics.append(&mut outcome.diagnostics);
    outcome.diagnostics = diagnostics;

    let brokers = broker_summary(&snap.trades);

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();

    let exports = trc_artifacts::write_run_exports(
        WriteRunExportsArgs {
            exports_root: &cfg.output.exports_root,
            run_id,
            config_hash: &loaded.config_hash,
            trade_date: cfg.trade_date,
            generated_at: started_at,
        },
        &outcome,
        &brokers,
    )?;

    if let Some(db_path) = &cfg.output.db_path {
        persist(db_path, run_id, started_at, &loaded, &cfg, &snap, &outcome).await?;
    }

    let stats = outcome.stats();
    info!(
        %run_id,
        matched = stats.matched,
        excess = stats.excess,
        pending = stats.pending,
        shortfalls = stats.shortfalls,
        diagnostics = stats.diagnostics,
        "reconciliation run complete"
    );

    Ok(RunSummary {
        run_id,
        config_hash: loaded.config_hash,
        trade_date: cfg.trade_date,
        files_read: snap.files_read.len(),
        orders: snap.orders.len(),
        trades: snap.trades.len(),
        out_of_date: snap.out_of_date,
        stats,
        run_dir: exports.run_dir,
        db_path: cfg.output.db_path.clone(),
    })
}

async fn persist(
    db_path: &Path,
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    loaded: &LoadedConfig,
    cfg: &ReconConfig,
    snap: &trc_ingest::TradeSnapshot,
    outcome: &trc_reconcile::ReconcileOutcome,
) -> Result<()> {
    let pool = trc_db::connect(db_path).await?;
    trc_db::migrate(&pool).await?;
    trc_db::save_run(
        &pool,
        &trc_db::NewReconRun {
            run_id,
            started_at_utc: started_at,
            config_hash: loaded.config_hash.clone(),
            trade_date: cfg.trade_date,
        },
        &snap.orders,
        &snap.trades,
        outcome,
    )
    .await
}

/// Config files merged in order, with command-line values as the last layer.
fn effective_config(args: &RunArgs) -> Result<LoadedConfig> {
    let mut layers = read_layers(&args.config_paths)?;
    let overlay = cli_overlay(args);
    if overlay.as_object().is_some_and(|m| !m.is_empty()) {
        // JSON is valid YAML.
        layers.push(overlay.to_string());
    }
    let refs: Vec<&str> = layers.iter().map(|s| s.as_str()).collect();
    trc_config::load_layered_yaml_from_strings(&refs)
}

fn cli_overlay(args: &RunArgs) -> Value {
    let mut inputs = Map::new();
    for (key, paths) in [
        ("orders", &args.orders),
        ("trades", &args.trades),
        ("auto_detect", &args.inputs),
        ("emails", &args.emails),
    ] {
        if !paths.is_empty() {
            inputs.insert(key.to_string(), path_list(paths));
        }
    }

    let mut output = Map::new();
    if let Some(root) = &args.exports_root {
        output.insert("exports_root".to_string(), json!(root.to_string_lossy()));
    }
    if let Some(db) = &args.db {
        output.insert("db_path".to_string(), json!(db.to_string_lossy()));
    }

    let mut top = Map::new();
    if !inputs.is_empty() {
        top.insert("inputs".to_string(), Value::Object(inputs));
    }
    if let Some(d) = args.trade_date {
        top.insert("trade_date".to_string(), json!(d.to_string()));
    }
    if !output.is_empty() {
        top.insert("output".to_string(), Value::Object(output));
    }
    Value::Object(top)
}

fn path_list(paths: &[PathBuf]) -> Value {
    Value::Array(
        paths
            .iter()
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_args_produce_empty_overlay() {
        let overlay = cli_overlay(&RunArgs::default());
        assert_eq!(overlay, json!({}));
    }

    #[test]
    fn cli_values_override_config_layers() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        std::fs::write(
            &base,
            "inputs:\n  orders: [a.csv]\n  trades: [b.csv]\noutput:\n  db_path: base.db\n",
        )
        .unwrap();

        let args = RunArgs {
            config_paths: vec![base],
            trades: vec![PathBuf::from("c.csv"), PathBuf::from("d.csv")],
            trade_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            db: Some(PathBuf::from("cli.db")),
            ..RunArgs::default()
        };
        let cfg = effective_config(&args).unwrap().recon().unwrap();
        assert_eq!(cfg.inputs.orders, vec![PathBuf::from("a.csv")]);
        assert_eq!(
            cfg.inputs.trades,
            vec![PathBuf::from("c.csv"), PathBuf::from("d.csv")]
        );
        assert_eq!(cfg.trade_date, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(cfg.output.db_path, Some(PathBuf::from("cli.db")));
    }

    #[test]
    fn email_flag_becomes_inputs_emails() {
        let args = RunArgs {
            emails: vec![PathBuf::from("broker1.eml"), PathBuf::from("broker2.eml")],
            ..RunArgs::default()
        };
        assert_eq!(
            cli_overlay(&args),
            json!({ "inputs": { "emails": ["broker1.eml", "broker2.eml"] } })
        );
        let cfg = effective_config(&args).unwrap().recon().unwrap();
        assert_eq!(cfg.inputs.emails.len(), 2);
        assert!(cfg.inputs.trades.is_empty());
    }

    #[test]
    fn hash_reflects_cli_overrides() {
        let a = effective_config(&RunArgs {
            orders: vec![PathBuf::from("o.csv")],
            ..RunArgs::default()
        })
        .unwrap();
        let b = effective_config(&RunArgs {
            orders: vec![PathBuf::from("o.csv")],
            trade_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            ..RunArgs::default()
        })
        .unwrap();
        assert_ne!(a.config_hash, b.config_hash);
    }
}
