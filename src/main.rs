// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use sitekit::{cli, commands, db, telemetry};

fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let path = db::db_path()?;
    let conn = db::open_at(&path)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", path.display());
        }
        Some(("backend", sub)) => commands::backends::handle(&conn, sub)?,
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        Some(("accounts", sub)) => commands::accounts::handle(&conn, sub)?,
        Some(("history", sub)) => commands::accounts::handle_operations(&conn, sub, false)?,
        Some(("coming", sub)) => commands::accounts::handle_operations(&conn, sub, true)?,
        Some(("documents", sub)) => commands::documents::handle(&conn, sub)?,
        Some(("profile", sub)) => commands::profile::handle(&conn, sub)?,
        Some(("track", sub)) => commands::track::handle(&conn, sub)?,
        Some(("watch", sub)) => commands::track::handle_watch(&path, &conn, sub)?,
        Some(("state", sub)) => commands::state::handle(&conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
