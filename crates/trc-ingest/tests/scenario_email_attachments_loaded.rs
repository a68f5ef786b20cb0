use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::tempdir;
use trc_ingest::{load_snapshot, FileKind, IngestError, SourceSpec};
use trc_reconcile::{reconcile, RecordKind, ResultStatus};

const ORDERS: &str = "\
UCC,Ticker,Direction,Date,Quantity
C001,INFY,BUY,31-01-2025,100
C002,INFY,HOLD,31-01-2025,10
";

const BROKER: &str = "\
UCC,Ticker,Buy/Sell Flag,Date,QTY,Brokerage Amount,STT,Net Amount
C001,INFY,B,2025-01-31,60,20,15.5,-96000
C001,INFY,B,2025-01-31,60,20,15.5,-96000
";

/// A broker mail in the shape desks receive: a text body, the day's files
/// as attachments, and a signature image that must be ignored.
fn message(attachments: &[(&str, &str)]) -> String {
    let mut m = String::from(
        "From: ops@broker1.example\n\
         To: recon@desk.example\n\
         Subject: Trade File BROKER 1 - 31_01_2025\n\
         MIME-Version: 1.0\n\
         Content-Type: multipart/mixed; boundary=\"XYZ\"\n\
         \n\
         --XYZ\n\
         Content-Type: text/plain; charset=utf-8\n\
         \n\
         Please find attached today's trade file.\n",
    );
    for (name, body) in attachments {
        m.push_str(&format!(
            "--XYZ\n\
             Content-Type: application/octet-stream; name=\"{name}\"\n\
             Content-Disposition: attachment; filename=\"{name}\"\n\
             Content-Transfer-Encoding: 7bit\n\
             \n\
             {body}"
        ));
    }
    m.push_str("--XYZ--\n");
    m.replace('\n', "\r\n")
}

fn write_eml(dir: &Path, name: &str, attachments: &[(&str, &str)]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, message(attachments))?;
    Ok(path)
}

#[test]
fn scenario_email_attachments_loaded() -> Result<()> {
    let tmp = tempdir()?;
    let eml = write_eml(
        tmp.path(),
        "broker1.eml",
        &[
            ("client_orders.csv", ORDERS),
            ("Trade File BROKER 1 - 31_01_2025.csv", BROKER),
            ("logo.png", "not an image\n"),
        ],
    )?;

    let snap = load_snapshot(&SourceSpec {
        emails: vec![eml.clone()],
        trade_date: NaiveDate::from_ymd_opt(2025, 1, 31),
        ..SourceSpec::default()
    })?;

    let src = eml.display().to_string();
    assert_eq!(
        snap.files_read,
        vec![
            (
                PathBuf::from(format!("{src}#client_orders.csv")),
                FileKind::ClientOrders
            ),
            (
                PathBuf::from(format!("{src}#Trade File BROKER 1 - 31_01_2025.csv")),
                FileKind::BrokerTrades
            ),
        ]
    );
    assert_eq!(snap.orders.len(), 1);
    assert_eq!(snap.trades.len(), 2);

    assert_eq!(snap.diagnostics.len(), 1);
    assert_eq!(snap.diagnostics[0].record, RecordKind::Order);
    assert_eq!(
        snap.diagnostics[0].origin,
        format!("{src}#client_orders.csv row 2")
    );

    // Mailed files reconcile exactly like CSV exports.
    let out = reconcile(&snap.orders, &snap.trades);
    assert_eq!(out.matched.len(), 1);
    assert_eq!(out.matched[0].status, ResultStatus::Partial);
    assert_eq!(out.excess.len(), 1);
    assert_eq!(out.excess[0].quantity, 40);
    Ok(())
}

#[test]
fn scenario_email_without_trade_files_is_empty() -> Result<()> {
    let tmp = tempdir()?;
    let eml = write_eml(tmp.path(), "note.eml", &[("logo.png", "x\n")])?;

    let snap = load_snapshot(&SourceSpec {
        emails: vec![eml],
        ..SourceSpec::default()
    })?;
    assert!(snap.files_read.is_empty());
    assert!(snap.orders.is_empty());
    assert!(snap.trades.is_empty());
    Ok(())
}

#[test]
fn scenario_unreadable_workbook_attachment_is_fatal() -> Result<()> {
    let tmp = tempdir()?;
    let eml = write_eml(
        tmp.path(),
        "broker2.eml",
        &[("broker2.xlsx", "this is not a zip archive\n")],
    )?;

    let err = load_snapshot(&SourceSpec {
        emails: vec![eml],
        ..SourceSpec::default()
    })
    .unwrap_err();
    assert!(matches!(err, IngestError::Spreadsheet(ref m) if m.contains("broker2.xlsx")));
    Ok(())
}

#[test]
fn scenario_missing_email_is_fatal() {
    let tmp = tempdir().unwrap();
    let err = load_snapshot(&SourceSpec {
        emails: vec![tmp.path().join("nope.eml")],
        ..SourceSpec::default()
    })
    .unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));
}
