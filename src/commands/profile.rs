// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{code, with_module};
use crate::capabilities::require;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let backend = m.get_one::<String>("backend").unwrap();
    let profile = with_module(conn, backend, code(m), |module| {
        let name = module.name().to_string();
        require(module.as_profile(), &name, "profile")?.get_profile()
    })?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &profile)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Name".to_string(), profile.name],
        vec!["Email".to_string(), profile.email.unwrap_or_default()],
        vec!["Phone".to_string(), profile.phone.unwrap_or_default()],
        vec!["Address".to_string(), profile.address.unwrap_or_default()],
    ];
    println!("{}", pretty_table(&["Field", "Value"], rows));
    Ok(())
}
