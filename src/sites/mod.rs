// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Site modules and the registry that builds them from a backend entry.

pub mod minibank;
pub mod parcel;

use crate::browser::BrowserConfig;
use crate::capabilities::Module;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Module names known to [`load`].
pub const MODULES: &[&str] = &[minibank::NAME, parcel::NAME];

/// A configured instance of a module: name chosen by the user, module
/// name and free-form parameters (URL, credentials, options).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl BackendConfig {
    pub fn new(name: &str, module: &str) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.param(key).ok_or_else(|| {
            Error::Config(format!("backend '{}' needs parameter '{}'", self.name, key))
        })
    }

    /// Browser settings from `url`, `timeout`, `retries`, `user_agent` and
    /// `verify_tls`, on top of `default_url`.
    pub fn browser_config(&self, default_url: &str) -> Result<BrowserConfig> {
        let mut config = BrowserConfig::new(self.param("url").unwrap_or(default_url));
        if config.base_url.is_empty() {
            return Err(Error::Config(format!("backend '{}' needs parameter 'url'", self.name)));
        }
        if !config.base_url.ends_with('/') {
            config.base_url.push('/');
        }
        if let Some(t) = self.param("timeout") {
            let secs = t
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("timeout '{}' is not a number of seconds", t)))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(r) = self.param("retries") {
            config.max_retries = r
                .parse()
                .map_err(|_| Error::Config(format!("retries '{}' is not a number", r)))?;
        }
        if let Some(ua) = self.param("user_agent") {
            config.user_agent = ua.to_string();
        }
        if let Some(v) = self.param("verify_tls") {
            config.verify_tls = !matches!(v, "0" | "false" | "no");
        }
        Ok(config)
    }
}

pub fn load(backend: &BackendConfig) -> Result<Box<dyn Module>> {
    match backend.module.as_str() {
        minibank::NAME => Ok(Box::new(minibank::MiniBank::new(backend)?)),
        parcel::NAME => Ok(Box::new(parcel::ParcelTracker::new(backend)?)),
        other => Err(Error::Config(format!(
            "unknown module '{}' (known: {})",
            other,
            MODULES.join(", ")
        ))),
    }
}
