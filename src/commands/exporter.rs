// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::accounts::fetch_operations;
use super::code;
use crate::models::Transaction;
use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("history", sub)) => {
            let backend = sub.get_one::<String>("backend").unwrap();
            let account = sub.get_one::<String>("account").unwrap();
            let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
            let out = sub.get_one::<String>("out").unwrap();
            let ops = fetch_operations(conn, backend, account, false, code(sub))?;
            write_transactions(&ops, &fmt, Path::new(out))?;
            println!("Exported {} operations to {}", ops.len(), out);
            Ok(())
        }
        _ => Ok(()),
    }
}

pub fn write_transactions(ops: &[Transaction], fmt: &str, out: &Path) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Create {}", out.display()))?;
            wtr.write_record(["id", "date", "rdate", "raw", "label", "category", "type", "amount"])?;
            for t in ops {
                wtr.write_record([
                    t.id.clone(),
                    t.date.map(|d| d.to_string()).unwrap_or_default(),
                    t.rdate.map(|d| d.to_string()).unwrap_or_default(),
                    t.raw.clone(),
                    t.label.clone(),
                    t.category.clone().unwrap_or_default(),
                    t.kind.to_string(),
                    t.amount.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(ops)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(())
}
