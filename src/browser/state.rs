// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Bumped whenever the layout of [`SessionState`] changes; older dumps are
/// discarded instead of half-loaded.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// URL the cookie was received from.
    pub url: String,
    /// Raw `Set-Cookie` header value.
    pub header: String,
}

impl StoredCookie {
    pub fn name(&self) -> &str {
        self.header.split('=').next().unwrap_or_default().trim()
    }
}

/// What a browser needs to resume a session in a later process: cookies,
/// last URL and module-specific values (tokens, OTP progress).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            url: None,
            cookies: Vec::new(),
            values: BTreeMap::new(),
        }
    }
}

impl SessionState {
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.saved_at > max_age
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let state: SessionState = serde_json::from_str(s)?;
        if state.version != STATE_VERSION {
            return Err(Error::State(format!(
                "version {} is not supported (expected {})",
                state.version, STATE_VERSION
            )));
        }
        Ok(state)
    }
}

/// Anything whose session can be dumped and restored across processes.
pub trait Stateful {
    fn dump_state(&self) -> SessionState;

    /// Returns `false` when the state was ignored (expired or outdated).
    fn load_state(&mut self, state: SessionState) -> Result<bool>;
}
