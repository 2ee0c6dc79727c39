// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use anyhow::{bail, Result};
use rusqlite::Connection;

pub const KEYS: &[&str] = &["user_agent", "timeout_secs"];

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            match db::get_setting(conn, key)? {
                Some(v) => println!("{}", v),
                None => println!("{} is not set", key),
            }
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let value = sub.get_one::<String>("value").unwrap().trim();
            if !KEYS.contains(&key) {
                bail!("Unknown setting '{}' (known: {})", key, KEYS.join(", "));
            }
            if key == "timeout_secs" && value.parse::<u64>().is_err() {
                bail!("timeout_secs must be a whole number of seconds");
            }
            db::set_setting(conn, key, value)?;
            println!("{} = {}", key, value);
        }
        _ => {}
    }
    Ok(())
}
