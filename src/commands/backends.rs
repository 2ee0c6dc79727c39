// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::sites::{BackendConfig, MODULES};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{bail, Result};
use rusqlite::Connection;

/// Parameters never echoed back.
const SECRET_PARAMS: &[&str] = &["password", "code"];

fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => bail!("Invalid parameter '{}', expected key=value", raw),
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let module = sub.get_one::<String>("module").unwrap().trim();
            if !MODULES.contains(&module) {
                bail!("Unknown module '{}' (known: {})", module, MODULES.join(", "));
            }
            let mut backend = BackendConfig::new(name, module);
            for raw in sub.get_many::<String>("param").into_iter().flatten() {
                let (k, v) = parse_param(raw)?;
                backend.params.insert(k, v);
            }
            db::add_backend(conn, &backend)?;
            println!("Added backend '{}' ({})", name, module);
        }
        Some(("list", sub)) => {
            let mut backends = db::list_backends(conn)?;
            for b in &mut backends {
                for (k, v) in b.params.iter_mut() {
                    if SECRET_PARAMS.contains(&k.as_str()) {
                        *v = "***".to_string();
                    }
                }
            }
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &backends)? {
                return Ok(());
            }
            let rows = backends
                .into_iter()
                .map(|b| {
                    let params = b
                        .params
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect::<Vec<_>>()
                        .join(" ");
                    vec![b.name, b.module, params]
                })
                .collect();
            println!("{}", pretty_table(&["Name", "Module", "Params"], rows));
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            if !db::remove_backend(conn, name)? {
                bail!("Backend '{}' not found", name);
            }
            println!("Removed backend '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
