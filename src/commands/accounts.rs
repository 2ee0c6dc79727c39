// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{code, with_module};
use crate::capabilities::require;
use crate::models::{Account, Transaction};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn fetch_accounts(conn: &Connection, backend: &str, code: Option<&str>) -> Result<Vec<Account>> {
    with_module(conn, backend, code, |module| {
        let name = module.name().to_string();
        require(module.as_bank(), &name, "bank")?.iter_accounts()
    })
}

/// History (or coming operations when `coming`) of one account.
pub fn fetch_operations(
    conn: &Connection,
    backend: &str,
    account: &str,
    coming: bool,
    code: Option<&str>,
) -> Result<Vec<Transaction>> {
    with_module(conn, backend, code, |module| {
        let name = module.name().to_string();
        let bank = require(module.as_bank(), &name, "bank")?;
        let account = bank.get_account(account)?;
        if coming {
            bank.iter_coming(&account)
        } else {
            bank.iter_history(&account)
        }
    })
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let backend = m.get_one::<String>("backend").unwrap();
    let accounts = fetch_accounts(conn, backend, code(m))?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &accounts)? {
        return Ok(());
    }
    let rows = accounts
        .into_iter()
        .map(|a| {
            vec![
                a.id,
                a.label,
                a.kind.to_string(),
                fmt_money(&a.balance, &a.currency),
                a.coming
                    .map(|c| fmt_money(&c, &a.currency))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Id", "Label", "Type", "Balance", "Coming"], rows)
    );
    Ok(())
}

pub fn handle_operations(conn: &Connection, m: &clap::ArgMatches, coming: bool) -> Result<()> {
    let backend = m.get_one::<String>("backend").unwrap();
    let account = m.get_one::<String>("account").unwrap();
    let ops = fetch_operations(conn, backend, account, coming, code(m))?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &ops)? {
        return Ok(());
    }
    let rows = ops
        .into_iter()
        .map(|t| {
            vec![
                t.date.map(|d| d.to_string()).unwrap_or_default(),
                t.label,
                t.kind.to_string(),
                t.category.unwrap_or_default(),
                t.amount.round_dp(2).to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Label", "Type", "Category", "Amount"], rows)
    );
    Ok(())
}
