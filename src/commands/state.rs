// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => {
            let backend = sub.get_one::<String>("backend").unwrap();
            db::get_backend(conn, backend)?;
            let Some(state) = db::load_state(conn, backend)? else {
                println!("No saved session for '{}'", backend);
                return Ok(());
            };
            let mut rows = vec![
                vec!["saved_at".to_string(), state.saved_at.to_rfc3339()],
                vec!["url".to_string(), state.url.clone().unwrap_or_default()],
            ];
            for c in &state.cookies {
                rows.push(vec!["cookie".to_string(), c.name().to_string()]);
            }
            for (k, v) in &state.values {
                rows.push(vec![k.clone(), v.to_string()]);
            }
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        Some(("clear", sub)) => {
            let backend = sub.get_one::<String>("backend").unwrap();
            if db::clear_state(conn, backend)? {
                println!("Cleared session of '{}'", backend);
            } else {
                println!("No saved session for '{}'", backend);
            }
        }
        _ => {}
    }
    Ok(())
}
