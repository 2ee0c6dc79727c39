// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{code, with_module};
use crate::capabilities::require;
use crate::models::Document;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name for a downloaded document, safe on every platform.
pub fn file_name(doc: &Document) -> String {
    let stem: String = doc
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let ext = if doc.format.is_empty() { "bin" } else { doc.format.as_str() };
    format!("{}.{}", stem, ext)
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let backend = m.get_one::<String>("backend").unwrap();
    let target = m.get_one::<String>("download").map(PathBuf::from);
    if let Some(dir) = &target {
        std::fs::create_dir_all(dir).with_context(|| format!("Create {}", dir.display()))?;
    }

    let docs = with_module(conn, backend, code(m), |module| {
        let name = module.name().to_string();
        let cap = require(module.as_documents(), &name, "documents")?;
        let mut out = Vec::new();
        for sub in cap.iter_subscriptions()? {
            for doc in cap.iter_documents(&sub)? {
                if let Some(dir) = &target {
                    if doc.has_file {
                        let bytes = cap.download_document(&doc)?;
                        save(dir, &doc, &bytes)?;
                    }
                }
                out.push((sub.label.clone(), doc));
            }
        }
        Ok(out)
    })?;

    let flat: Vec<&Document> = docs.iter().map(|(_, d)| d).collect();
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &flat)? {
        return Ok(());
    }
    let rows = docs
        .iter()
        .map(|(sub, d)| {
            vec![
                sub.clone(),
                d.id.clone(),
                d.date.map(|x| x.to_string()).unwrap_or_default(),
                d.label.clone(),
                d.kind.to_string(),
                d.format.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Subscription", "Id", "Date", "Label", "Type", "Format"], rows)
    );
    Ok(())
}

fn save(dir: &Path, doc: &Document, bytes: &[u8]) -> crate::error::Result<()> {
    let path = dir.join(file_name(doc));
    std::fs::write(&path, bytes)
        .map_err(|e| crate::error::Error::Data(format!("cannot write {}: {}", path.display(), e)))?;
    info!(path = %path.display(), size = bytes.len(), "document saved");
    Ok(())
}
