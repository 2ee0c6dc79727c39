// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::browser::SessionState;
use crate::sites::BackendConfig;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Sitekit", "sitekit"));

/// Overrides the database location.
pub const DB_ENV: &str = "SITEKIT_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("sitekit.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Create {}", dir.display()))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS backends(
        name TEXT PRIMARY KEY,
        module TEXT NOT NULL,
        params TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- one saved browser session per backend
    CREATE TABLE IF NOT EXISTS sessions(
        backend TEXT PRIMARY KEY,
        state TEXT NOT NULL,
        saved_at TEXT NOT NULL,
        FOREIGN KEY(backend) REFERENCES backends(name) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS storage(
        namespace TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY(namespace, key)
    );
    "#,
    )?;
    Ok(())
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| r.get(0))
        .optional()?)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key,value) VALUES(?1,?2) ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn add_backend(conn: &Connection, backend: &BackendConfig) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM backends WHERE name=?1)",
        params![backend.name],
        |r| r.get(0),
    )?;
    if exists {
        bail!("Backend '{}' already exists", backend.name);
    }
    conn.execute(
        "INSERT INTO backends(name, module, params) VALUES(?1,?2,?3)",
        params![backend.name, backend.module, serde_json::to_string(&backend.params)?],
    )?;
    Ok(())
}

fn backend_from_row(name: String, module: String, raw: String) -> Result<BackendConfig> {
    let params = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid parameters stored for backend '{}'", name))?;
    Ok(BackendConfig { name, module, params })
}

pub fn list_backends(conn: &Connection) -> Result<Vec<BackendConfig>> {
    let mut stmt = conn.prepare("SELECT name, module, params FROM backends ORDER BY name")?;
    let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?;
    let mut out = Vec::new();
    for row in rows {
        let (name, module, raw) = row?;
        out.push(backend_from_row(name, module, raw)?);
    }
    Ok(out)
}

pub fn get_backend(conn: &Connection, name: &str) -> Result<BackendConfig> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT name, module, params FROM backends WHERE name=?1",
            params![name],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let (name, module, raw) = row.with_context(|| format!("Backend '{}' not found", name))?;
    backend_from_row(name, module, raw)
}

pub fn remove_backend(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM backends WHERE name=?1", params![name])? > 0)
}

pub fn save_state(conn: &Connection, backend: &str, state: &SessionState) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions(backend, state, saved_at) VALUES(?1,?2,?3)
         ON CONFLICT(backend) DO UPDATE SET state=excluded.state, saved_at=excluded.saved_at",
        params![backend, state.to_json()?, state.saved_at.to_rfc3339()],
    )
    .with_context(|| format!("Save session of '{}'", backend))?;
    debug!(backend, cookies = state.cookies.len(), "session saved");
    Ok(())
}

/// A stored state that no longer parses is dropped, not fatal.
pub fn load_state(conn: &Connection, backend: &str) -> Result<Option<SessionState>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT state FROM sessions WHERE backend=?1",
            params![backend],
            |r| r.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    match SessionState::from_json(&raw) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            warn!(backend, error = %e, "discarding stored session");
            clear_state(conn, backend)?;
            Ok(None)
        }
    }
}

pub fn clear_state(conn: &Connection, backend: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM sessions WHERE backend=?1", params![backend])? > 0)
}

/// Namespaced key/value store with JSON values, for trackers and bots
/// remembering what they already saw.
pub struct Storage<'c> {
    conn: &'c Connection,
    namespace: String,
}

impl<'c> Storage<'c> {
    pub fn new(conn: &'c Connection, namespace: &str) -> Self {
        Self {
            conn,
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM storage WHERE namespace=?1 AND key=?2",
                params![self.namespace, key],
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw).with_context(|| {
                format!("Stored value {}/{} has another shape", self.namespace, key)
            })?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.conn.execute(
            "INSERT INTO storage(namespace, key, value) VALUES(?1,?2,?3)
             ON CONFLICT(namespace, key) DO UPDATE SET value=excluded.value, updated_at=datetime('now')",
            params![self.namespace, key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.conn.execute(
            "DELETE FROM storage WHERE namespace=?1 AND key=?2",
            params![self.namespace, key],
        )? > 0)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM storage WHERE namespace=?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.namespace], |r| r.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    pub fn items(&self) -> Result<Vec<(String, Value)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM storage WHERE namespace=?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.namespace], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (key, raw) = row?;
            out.push((key, serde_json::from_str(&raw)?));
        }
        Ok(out)
    }
}
