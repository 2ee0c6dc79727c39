// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};
use serde_json::json;
use sitekit::browser::{SessionState, StoredCookie};
use sitekit::db::{self, Storage};
use sitekit::sites::BackendConfig;
use tempfile::tempdir;

fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn bank() -> BackendConfig {
    BackendConfig::new("mybank", "minibank")
        .with_param("login", "alice")
        .with_param("password", "s3cret")
}

#[test]
fn open_at_creates_parent_dirs_and_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("sitekit.sqlite");
    let conn = db::open_at(&path).unwrap();
    assert!(path.exists());
    db::add_backend(&conn, &bank()).unwrap();
    drop(conn);

    let again = db::open_at(&path).unwrap();
    assert_eq!(db::list_backends(&again).unwrap().len(), 1);
}

#[test]
fn settings_upsert() {
    let conn = conn();
    assert_eq!(db::get_setting(&conn, "timeout_secs").unwrap(), None);
    db::set_setting(&conn, "timeout_secs", "10").unwrap();
    db::set_setting(&conn, "timeout_secs", "30").unwrap();
    assert_eq!(db::get_setting(&conn, "timeout_secs").unwrap().as_deref(), Some("30"));
}

#[test]
fn backends_crud() {
    let conn = conn();
    db::add_backend(&conn, &bank()).unwrap();
    db::add_backend(&conn, &BackendConfig::new("dhl", "parcel")).unwrap();
    assert!(db::add_backend(&conn, &bank()).is_err());

    let names: Vec<String> = db::list_backends(&conn).unwrap().into_iter().map(|b| b.name).collect();
    assert_eq!(names, ["dhl", "mybank"]);
    assert_eq!(db::get_backend(&conn, "mybank").unwrap(), bank());

    assert!(db::remove_backend(&conn, "dhl").unwrap());
    assert!(!db::remove_backend(&conn, "dhl").unwrap());
    let err = db::get_backend(&conn, "dhl").unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn session_state_save_load_clear() {
    let conn = conn();
    db::add_backend(&conn, &bank()).unwrap();
    assert!(db::load_state(&conn, "mybank").unwrap().is_none());

    let mut state = SessionState::default();
    state.cookies.push(StoredCookie {
        url: "https://bank.example/".to_string(),
        header: "sid=1; Path=/".to_string(),
    });
    state.values.insert("otp_pending".to_string(), json!(true));
    db::save_state(&conn, "mybank", &state).unwrap();
    state.values.insert("otp_pending".to_string(), json!(false));
    db::save_state(&conn, "mybank", &state).unwrap();

    let loaded = db::load_state(&conn, "mybank").unwrap().unwrap();
    assert_eq!(loaded, state);

    assert!(db::clear_state(&conn, "mybank").unwrap());
    assert!(db::load_state(&conn, "mybank").unwrap().is_none());
    assert!(!db::clear_state(&conn, "mybank").unwrap());
}

#[test]
fn unreadable_state_is_discarded() {
    let conn = conn();
    db::add_backend(&conn, &bank()).unwrap();
    conn.execute(
        "INSERT INTO sessions(backend, state, saved_at) VALUES(?1, ?2, datetime('now'))",
        params!["mybank", r#"{"version": 99, "saved_at": "2024-01-01T00:00:00Z"}"#],
    )
    .unwrap();
    assert!(db::load_state(&conn, "mybank").unwrap().is_none());
    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(left, 0);
}

#[test]
fn removing_a_backend_drops_its_session() {
    let conn = conn();
    db::add_backend(&conn, &bank()).unwrap();
    db::save_state(&conn, "mybank", &SessionState::default()).unwrap();
    db::remove_backend(&conn, "mybank").unwrap();
    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(left, 0);
}

#[test]
fn storage_namespaces_are_isolated() {
    let conn = conn();
    let a = Storage::new(&conn, "watch:dhl");
    let b = Storage::new(&conn, "watch:other");
    a.set("123", &("in_transit", "Departed")).unwrap();
    a.set("456", &json!({"n": 1})).unwrap();
    b.set("123", &"elsewhere").unwrap();

    let got: Option<(String, String)> = a.get("123").unwrap();
    assert_eq!(got, Some(("in_transit".to_string(), "Departed".to_string())));
    assert_eq!(a.keys().unwrap(), ["123", "456"]);
    assert_eq!(b.get::<String>("123").unwrap().as_deref(), Some("elsewhere"));
    assert_eq!(a.namespace(), "watch:dhl");

    a.set("456", &json!({"n": 2})).unwrap();
    let items = a.items().unwrap();
    assert_eq!(items[1], ("456".to_string(), json!({"n": 2})));

    assert!(a.delete("123").unwrap());
    assert!(!a.delete("123").unwrap());
    assert_eq!(a.get::<String>("123").unwrap(), None);
    assert!(a.get::<u32>("456").is_err());
}
