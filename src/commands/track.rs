// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::with_module;
use crate::capabilities::require;
use crate::db::{self, Storage};
use crate::models::{Parcel, ParcelStatus};
use crate::scheduler::Scheduler;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub fn fetch_parcel(conn: &Connection, backend: &str, id: &str) -> Result<Parcel> {
    with_module(conn, backend, None, |module| {
        let name = module.name().to_string();
        require(module.as_parcel(), &name, "parcel")?.get_parcel_tracking(id)
    })
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let backend = m.get_one::<String>("backend").unwrap();
    let id = m.get_one::<String>("id").unwrap();
    let parcel = fetch_parcel(conn, backend, id)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &parcel)? {
        return Ok(());
    }
    println!("{} [{}] {}", parcel.id, parcel.status, parcel.info);
    let rows = parcel
        .history
        .into_iter()
        .map(|e| {
            vec![
                e.date.map(|d| d.to_string()).unwrap_or_default(),
                e.location,
                e.activity,
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Date", "Location", "Activity"], rows));
    Ok(())
}

/// Parcels whose status or last event differs from the previous check.
pub fn changed_parcels(conn: &Connection, backend: &str, ids: &[String]) -> Result<Vec<Parcel>> {
    let store = Storage::new(conn, &format!("watch:{}", backend));
    let mut changed = Vec::new();
    for id in ids {
        let parcel = fetch_parcel(conn, backend, id)?;
        let seen: Option<(ParcelStatus, String)> = store.get(id)?;
        let now = (parcel.status, parcel.info.clone());
        if seen.as_ref() != Some(&now) {
            store.set(id, &now)?;
            changed.push(parcel);
        }
    }
    Ok(changed)
}

fn report(parcels: &[Parcel]) {
    for p in parcels {
        println!("{} [{}] {}", p.id, p.status, p.info);
    }
}

pub fn handle_watch(db_path: &Path, conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let backend = m.get_one::<String>("backend").unwrap().clone();
    let ids: Vec<String> = m.get_many::<String>("id").unwrap().cloned().collect();
    let every = *m.get_one::<u64>("every").unwrap();
    let times = m.get_one::<u32>("times").copied();
    db::get_backend(conn, &backend)?;

    let scheduler = Scheduler::new();
    let stopper = scheduler.clone();
    let job_conn = db::open_at(db_path)?;
    let mut rounds = 0u32;
    scheduler
        .repeat(Duration::from_secs(every), move || {
            rounds += 1;
            if times.is_some_and(|t| rounds >= t) {
                stopper.want_stop();
            }
            report(&changed_parcels(&job_conn, &backend, &ids)?);
            Ok(())
        })
        .context("Scheduler refused the job")?;
    info!(every, "watching parcels");
    scheduler.run();
    Ok(())
}
