// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod backends;
pub mod config;
pub mod documents;
pub mod exporter;
pub mod profile;
pub mod state;
pub mod track;

use crate::capabilities::Module;
use crate::{db, sites};
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Settings applied to every backend unless it sets its own.
const SETTING_PARAMS: &[(&str, &str)] = &[("user_agent", "user_agent"), ("timeout_secs", "timeout")];

/// Build the module of `backend`, restore its session, run `f`, and save
/// the session again whatever `f` returned.
pub fn with_module<T>(
    conn: &Connection,
    backend: &str,
    code: Option<&str>,
    f: impl FnOnce(&mut dyn Module) -> crate::error::Result<T>,
) -> Result<T> {
    let mut config = db::get_backend(conn, backend)?;
    for (setting, param) in SETTING_PARAMS {
        if !config.params.contains_key(*param) {
            if let Some(v) = db::get_setting(conn, setting)? {
                config.params.insert(param.to_string(), v);
            }
        }
    }
    if let Some(code) = code {
        config.params.insert("code".to_string(), code.to_string());
    }

    let mut module = sites::load(&config).with_context(|| format!("Load backend '{}'", backend))?;
    if let Some(state) = db::load_state(conn, backend)? {
        let restored = module.load_state(state)?;
        debug!(backend, restored, "session state");
    }

    let out = f(module.as_mut());
    db::save_state(conn, backend, &module.dump_state())?;
    match out {
        Ok(v) => Ok(v),
        Err(crate::error::Error::ActionNeeded(prompt)) => {
            info!(backend, "waiting for user input");
            anyhow::bail!("{} (run again with --code)", prompt)
        }
        Err(e) => Err(e).with_context(|| format!("Backend '{}'", backend)),
    }
}

pub(crate) fn code(m: &clap::ArgMatches) -> Option<&str> {
    m.get_one::<String>("code").map(String::as_str)
}
