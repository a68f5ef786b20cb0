use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use trc_reconcile::{
    AllocationRecord, BrokerTrade, Money, Order, PendingRecord, ReconcileOutcome, ResultStatus,
};

/// Open (creating if missing) the SQLite database at `db_path`.
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(opts)
        .await
        .with_context(|| format!("failed to open sqlite db: {}", db_path.display()))?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_runs_table: bool,
    pub run_count: i64,
}

/// Connectivity, schema presence and stored run count.
pub async fn status(pool: &SqlitePool) -> Result<DbStatus> {
    let (one,): (i64,) = sqlx::query_as::<_, (i64,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (tables,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*) from sqlite_master where type = 'table' and name = 'recon_runs'",
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;
    let has_runs_table = tables > 0;

    // Unmigrated DB: report zero runs rather than failing.
    let run_count = if has_runs_table {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*) from recon_runs")
            .fetch_one(pool)
            .await
            .context("status run count failed")?;
        n
    } else {
        0
    };

    Ok(DbStatus {
        ok,
        has_runs_table,
        run_count,
    })
}

#[derive(Debug, Clone)]
pub struct NewReconRun {
    pub run_id: Uuid,
    pub started_at_utc: DateTime<Utc>,
    pub config_hash: String,
    pub trade_date: Option<NaiveDate>,
}

/// Persist one run: its inputs, every result row and the run header.
///
/// All rows go in one transaction; a failure leaves no trace of the run.
pub async fn save_run(
    pool: &SqlitePool,
    run: &NewReconRun,
    orders: &[Order],
    trades: &[BrokerTrade],
    outcome: &ReconcileOutcome,
) -> Result<()> {
    let run_id = run.run_id.to_string();
    let stats = outcome.stats();

    let mut tx = pool.begin().await.context("save_run begin failed")?;

    sqlx::query(
        r#"
        insert into recon_runs (
          run_id, started_at_utc, config_hash, trade_date, orders_processed,
          matched_count, excess_count, pending_count, shortfall_count, diagnostic_count
        ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&run_id)
    .bind(run.started_at_utc)
    .bind(&run.config_hash)
    .bind(run.trade_date)
    .bind(count(stats.orders_processed)?)
    .bind(count(stats.matched)?)
    .bind(count(stats.excess)?)
    .bind(count(stats.pending)?)
    .bind(count(stats.shortfalls)?)
    .bind(count(stats.diagnostics)?)
    .execute(&mut *tx)
    .await
    .context("insert recon_runs failed")?;

    for (seq, o) in orders.iter().enumerate() {
        sqlx::query(
            r#"
            insert into client_orders (run_id, seq, order_id, symbol, side, trade_date, quantity)
            values (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run_id)
        .bind(count(seq)?)
        .bind(&o.id)
        .bind(&o.symbol)
        .bind(o.side.as_str())
        .bind(o.trade_date)
        .bind(qty(o.quantity)?)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert client_orders failed: {}", o.id))?;
    }

    for (seq, t) in trades.iter().enumerate() {
        sqlx::query(
            r#"
            insert into broker_trades (
              run_id, seq, trade_id, symbol, side, trade_date, quantity,
              brokerage_micros, stt_micros, net_amount_micros, broker_code
            ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run_id)
        .bind(count(seq)?)
        .bind(&t.id)
        .bind(&t.symbol)
        .bind(t.side.as_str())
        .bind(t.trade_date)
        .bind(qty(t.quantity)?)
        .bind(t.brokerage.micros())
        .bind(t.stt.micros())
        .bind(t.net_amount.micros())
        .bind(t.broker_code.as_deref())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert broker_trades failed: {}", t.id))?;
    }

    let mut seq: usize = 0;
    for r in outcome.matched.iter().chain(outcome.excess.iter()) {
        insert_allocation(&mut tx, &run_id, seq, r).await?;
        seq += 1;
    }
    for p in &outcome.pending {
        insert_pending(&mut tx, &run_id, seq, p).await?;
        seq += 1;
    }

    tx.commit().await.context("save_run commit failed")?;

    info!(run_id = %run.run_id, results = seq, "run saved");
    Ok(())
}

async fn insert_allocation(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    run_id: &str,
    seq: usize,
    r: &AllocationRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into reconciliation_results (
          run_id, seq, order_id, trade_id, symbol, quantity, status,
          brokerage_micros, stt_micros, total_cost_micros, slippage_micros
        ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run_id)
    .bind(count(seq)?)
    .bind(&r.order_id)
    .bind(&r.trade_id)
    .bind(&r.symbol)
    .bind(qty(r.quantity)?)
    .bind(r.status.as_str())
    .bind(r.brokerage_cost.micros())
    .bind(r.stt.micros())
    .bind(r.total_cost.micros())
    .bind(r.slippage.micros())
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert result failed: {} / {}", r.order_id, r.trade_id))?;
    Ok(())
}

async fn insert_pending(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    run_id: &str,
    seq: usize,
    p: &PendingRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into reconciliation_results (run_id, seq, order_id, trade_id, symbol, quantity, status)
        values (?, ?, ?, NULL, ?, ?, ?)
        "#,
    )
    .bind(run_id)
    .bind(count(seq)?)
    .bind(&p.order_id)
    .bind(&p.symbol)
    .bind(qty(p.quantity)?)
    .bind(p.status.as_str())
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert pending result failed: {}", p.order_id))?;
    Ok(())
}

/// One row of `reconciliation_results`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub order_id: String,
    pub trade_id: Option<String>,
    pub symbol: String,
    pub quantity: i64,
    pub status: ResultStatus,
    pub total_cost: Option<Money>,
    pub slippage: Option<Money>,
}

/// Results of one run in insertion order (matched, excess, pending).
pub async fn fetch_results(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<StoredResult>> {
    let rows = sqlx::query(
        r#"
        select order_id, trade_id, symbol, quantity, status, total_cost_micros, slippage_micros
        from reconciliation_results
        where run_id = ?
        order by seq
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await
    .context("fetch_results failed")?;

    rows.iter()
        .map(|row| -> Result<StoredResult> {
            Ok(StoredResult {
                order_id: row.try_get("order_id")?,
                trade_id: row.try_get("trade_id")?,
                symbol: row.try_get("symbol")?,
                quantity: row.try_get("quantity")?,
                status: parse_status(&row.try_get::<String, _>("status")?)?,
                total_cost: row
                    .try_get::<Option<i64>, _>("total_cost_micros")?
                    .map(Money::new),
                slippage: row
                    .try_get::<Option<i64>, _>("slippage_micros")?
                    .map(Money::new),
            })
        })
        .collect()
}

/// Stored input row counts for a run: (client_orders, broker_trades).
pub async fn count_inputs(pool: &SqlitePool, run_id: Uuid) -> Result<(i64, i64)> {
    let id = run_id.to_string();
    let (orders,): (i64,) =
        sqlx::query_as::<_, (i64,)>("select count(*) from client_orders where run_id = ?")
            .bind(&id)
            .fetch_one(pool)
            .await
            .context("count client_orders failed")?;
    let (trades,): (i64,) =
        sqlx::query_as::<_, (i64,)>("select count(*) from broker_trades where run_id = ?")
            .bind(&id)
            .fetch_one(pool)
            .await
            .context("count broker_trades failed")?;
    Ok((orders, trades))
}

pub fn parse_status(s: &str) -> Result<ResultStatus> {
    match s {
        "MATCHED" => Ok(ResultStatus::Matched),
        "PARTIAL" => Ok(ResultStatus::Partial),
        "EXCESS" => Ok(ResultStatus::Excess),
        "PENDING" => Ok(ResultStatus::Pending),
        other => Err(anyhow!("invalid result status: {}", other)),
    }
}

// SQLite integers are signed 64-bit.
fn qty(q: u64) -> Result<i64> {
    i64::try_from(q).map_err(|_| anyhow!("quantity out of range for storage: {q}"))
}

fn count(n: usize) -> Result<i64> {
    i64::try_from(n).map_err(|_| anyhow!("count out of range for storage: {n}"))
}
