use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

#[test]
fn identify_classifies_by_name_then_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("client_orders.csv"), "UCC,Ticker\n")?;
    fs::write(dir.path().join("broker2.csv"), "UCC,Ticker\n")?;
    fs::write(dir.path().join("day.csv"), "UCC,Buy/Sell Flag,QTY\n")?;

    Command::cargo_bin("trc")?
        .current_dir(dir.path())
        .args(["identify", "client_orders.csv", "broker2.csv", "day.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("client_orders.csv kind=orders"))
        .stdout(predicate::str::contains("broker2.csv kind=trades"))
        .stdout(predicate::str::contains("day.csv kind=trades"));
    Ok(())
}

#[test]
fn config_hash_prints_hash_and_canonical_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.yaml"), "trade_date: \"2025-01-31\"\noutput:\n  db_path: a.db\n")?;
    fs::write(dir.path().join("b.yaml"), "output:\n  db_path: b.db\n")?;

    Command::cargo_bin("trc")?
        .current_dir(dir.path())
        .args(["config-hash", "a.yaml", "b.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("config_hash=[0-9a-f]{64}")?)
        .stdout(predicate::str::contains(
            r#"{"output":{"db_path":"b.db"},"trade_date":"2025-01-31"}"#,
        ));
    Ok(())
}

#[test]
fn db_migrate_creates_schema() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("fresh.db");

    Command::cargo_bin("trc")?
        .args(["db", "migrate", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    Command::cargo_bin("trc")?
        .args(["db", "status", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("db_ok=true has_runs_table=true run_count=0"));
    Ok(())
}
