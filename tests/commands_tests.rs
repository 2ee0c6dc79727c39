// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use chrono::NaiveDate;
use common::{Recorded, Reply, StubServer};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::json;
use sitekit::commands::{accounts, backends, config, documents, exporter, track};
use sitekit::models::{Document, ParcelStatus, Transaction, TransactionType};
use sitekit::sites::BackendConfig;
use sitekit::{cli, db};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn run(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let matches = cli::build_cli().try_get_matches_from(args)?;
    match matches.subcommand() {
        Some(("backend", sub)) => backends::handle(conn, sub),
        Some(("config", sub)) => config::handle(conn, sub),
        other => panic!("unexpected subcommand {:?}", other.map(|(n, _)| n)),
    }
}

#[test]
fn cli_parses_watch_defaults() {
    let m = cli::build_cli()
        .try_get_matches_from(["sitekit", "watch", "dhl", "123", "JJ456"])
        .unwrap();
    let (name, sub) = m.subcommand().unwrap();
    assert_eq!(name, "watch");
    assert_eq!(sub.get_one::<u64>("every").copied(), Some(600));
    assert_eq!(sub.get_one::<u32>("times"), None);
    let ids: Vec<&String> = sub.get_many::<String>("id").unwrap().collect();
    assert_eq!(ids, ["123", "JJ456"]);

    assert!(cli::build_cli()
        .try_get_matches_from(["sitekit", "accounts", "mybank", "--json", "--jsonl"])
        .is_err());
    assert!(cli::build_cli()
        .try_get_matches_from(["sitekit", "export", "history", "mybank", "A1", "--format", "xml", "--out", "x"])
        .is_err());
}

#[test]
fn backend_add_list_rm() {
    let conn = conn();
    run(
        &conn,
        &["sitekit", "backend", "add", "mybank", "minibank", "-p", "login=alice", "-p", "password=a=b"],
    )
    .unwrap();
    let stored = db::get_backend(&conn, "mybank").unwrap();
    assert_eq!(stored.param("login"), Some("alice"));
    assert_eq!(stored.param("password"), Some("a=b"));
    run(&conn, &["sitekit", "backend", "list", "--json"]).unwrap();

    run(&conn, &["sitekit", "backend", "rm", "mybank"]).unwrap();
    assert!(db::list_backends(&conn).unwrap().is_empty());
    let err = run(&conn, &["sitekit", "backend", "rm", "mybank"]).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn backend_add_rejects_bad_input() {
    let conn = conn();
    let cases = [
        (vec!["sitekit", "backend", "add", "x", "nobank"], "Unknown module"),
        (vec!["sitekit", "backend", "add", "x", "minibank", "-p", "login"], "expected key=value"),
        (vec!["sitekit", "backend", "add", "x", "minibank", "-p", "=v"], "expected key=value"),
    ];
    for (args, msg) in cases {
        let err = run(&conn, &args).unwrap_err();
        assert!(err.to_string().contains(msg), "{:?}: {}", args, err);
    }
    assert!(db::list_backends(&conn).unwrap().is_empty());
}

#[test]
fn config_set_validates_keys_and_values() {
    let conn = conn();
    run(&conn, &["sitekit", "config", "set", "timeout_secs", "45"]).unwrap();
    assert_eq!(db::get_setting(&conn, "timeout_secs").unwrap().as_deref(), Some("45"));
    assert!(run(&conn, &["sitekit", "config", "set", "timeout_secs", "soon"]).is_err());
    assert!(run(&conn, &["sitekit", "config", "set", "colour", "blue"]).is_err());
}

fn sample_ops() -> Vec<Transaction> {
    vec![
        Transaction {
            id: "op1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 14),
            raw: "CARTE 10/03 BOULANGERIE".to_string(),
            label: "BOULANGERIE".to_string(),
            rdate: NaiveDate::from_ymd_opt(2024, 3, 10),
            amount: Decimal::new(-320, 2),
            kind: TransactionType::Card,
            ..Transaction::default()
        },
        Transaction {
            id: "op2".to_string(),
            raw: "PRLV SEPA EDF".to_string(),
            label: "EDF".to_string(),
            category: Some("PRLV SEPA".to_string()),
            amount: Decimal::new(-4500, 2),
            kind: TransactionType::Order,
            ..Transaction::default()
        },
    ]
}

#[test]
fn export_writes_csv_and_json() {
    let dir = tempdir().unwrap();
    let ops = sample_ops();

    let csv_path = dir.path().join("ops.csv");
    exporter::write_transactions(&ops, "csv", &csv_path).unwrap();
    let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, ["id", "date", "rdate", "raw", "label", "category", "type", "amount"]);
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "2024-03-14");
    assert_eq!(&rows[0][2], "2024-03-10");
    assert_eq!(&rows[0][6], "card");
    assert_eq!(&rows[0][7], "-3.20");
    assert_eq!(&rows[1][1], "");
    assert_eq!(&rows[1][5], "PRLV SEPA");

    let json_path = dir.path().join("ops.json");
    exporter::write_transactions(&ops, "json", &json_path).unwrap();
    let back: Vec<Transaction> = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(back, ops);

    assert!(exporter::write_transactions(&ops, "xml", &dir.path().join("ops.xml")).is_err());
}

#[test]
fn document_file_names_are_sanitised() {
    let cases = [
        ("D1", "pdf", "D1.pdf"),
        ("2024/02 relevé", "pdf", "2024_02_relev_.pdf"),
        ("a-b_c", "", "a-b_c.bin"),
    ];
    for (id, format, want) in cases {
        let doc = Document {
            id: id.to_string(),
            format: format.to_string(),
            ..Document::default()
        };
        assert_eq!(documents::file_name(&doc), want);
    }
}

const LOGIN_FORM: &str = r#"<form method="post"><input name="username"><input name="password" type="password"></form>"#;
const OTP_FORM: &str = r#"<p class="prompt">Code reçu par SMS</p><form method="post"><input name="code"></form>"#;
const ACCOUNTS: &str = r#"
<table id="accounts">
  <thead><tr><th>Compte</th><th>Libellé</th><th>Solde</th><th>Devise</th></tr></thead>
  <tbody><tr><td>A1</td><td>Compte courant</td><td>100,00</td><td>EUR</td></tr></tbody>
</table>"#;

/// Bank asking for a one-time code after every password login.
fn otp_bank(req: &Recorded) -> Reply {
    let html = |body: &str| Reply::html(&format!("<html><body>{}</body></html>", body));
    let sid = req.cookie("sid");
    match (req.method.as_str(), req.path(), sid.as_deref()) {
        ("GET", "/login", _) => html(LOGIN_FORM),
        ("POST", "/login", _) => Reply::redirect("/otp").with_cookie("sid=half; Path=/"),
        ("GET", "/otp", Some("half")) => html(OTP_FORM),
        ("POST", "/otp", Some("half")) if req.form().get("code").map(String::as_str) == Some("123456") => {
            Reply::redirect("/accounts").with_cookie("sid=full; Path=/")
        }
        ("POST", "/otp", Some("half")) => html(&format!(r#"{}<div class="error">Code invalide</div>"#, OTP_FORM)),
        ("GET", "/accounts", Some("full")) => html(ACCOUNTS),
        (_, _, Some("half")) => Reply::redirect("/otp"),
        _ => Reply::redirect("/login"),
    }
}

#[test]
fn accounts_resume_a_pending_code_across_runs() {
    let server = StubServer::start(otp_bank);
    let conn = conn();
    let bank = BackendConfig::new("mybank", "minibank")
        .with_param("url", &server.base)
        .with_param("login", "alice")
        .with_param("password", "s3cret")
        .with_param("retries", "0");
    db::add_backend(&conn, &bank).unwrap();

    let err = accounts::fetch_accounts(&conn, "mybank", None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Code reçu par SMS"), "{}", msg);
    assert!(msg.contains("--code"), "{}", msg);
    assert!(db::load_state(&conn, "mybank").unwrap().is_some());

    let accounts = accounts::fetch_accounts(&conn, "mybank", Some("123456")).unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].balance, Decimal::new(10000, 2));

    // the saved session is enough for the next run
    accounts::fetch_accounts(&conn, "mybank", None).unwrap();
    let logins = server.requests().iter().filter(|r| r.is("POST", "/login")).count();
    assert_eq!(logins, 1);

    assert!(accounts::fetch_accounts(&conn, "nobody", None).is_err());
}

#[test]
fn watch_reports_only_changes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let server = StubServer::start(move |req: &Recorded| {
        let n = seen.fetch_add(1, Ordering::SeqCst);
        let code = if n < 2 { "102" } else { "101" };
        Reply::json(&json!({
            "results": [{
                "delivery": {"code": code},
                "checkpoints": [{"date": "14.03.2024", "time": "10:15", "location": "LEIPZIG", "description": format!("step {}", code)}]
            }],
            "awb": req.query("AWB")
        }))
    });
    let conn = conn();
    db::add_backend(&conn, &BackendConfig::new("dhl", "parcel").with_param("url", &server.base)).unwrap();
    let ids = vec!["1234567890".to_string()];

    let first = track::changed_parcels(&conn, "dhl", &ids).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, ParcelStatus::InTransit);
    assert!(track::changed_parcels(&conn, "dhl", &ids).unwrap().is_empty());
    let moved = track::changed_parcels(&conn, "dhl", &ids).unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].status, ParcelStatus::Arrived);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
