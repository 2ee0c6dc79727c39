// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::state::{SessionState, Stateful};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::info;

const LAST_BROWSER: &str = "last_browser";

type Factory<B> = Box<dyn Fn() -> Result<B> + Send>;

/// Proxy over mutually exclusive sub-site browsers.
///
/// Starts on `"main"`. When a call fails with [`Error::SiteSwitch`], the
/// named browser is built and the call is retried once on it.
pub struct SwitchingBrowser<B> {
    factories: BTreeMap<String, Factory<B>>,
    current: B,
    name: String,
    keep_session: bool,
}

impl<B: Stateful> SwitchingBrowser<B> {
    pub fn new(main: impl Fn() -> Result<B> + Send + 'static) -> Result<Self> {
        let current = main()?;
        let mut factories: BTreeMap<String, Factory<B>> = BTreeMap::new();
        factories.insert("main".to_string(), Box::new(main));
        Ok(Self {
            factories,
            current,
            name: "main".to_string(),
            keep_session: false,
        })
    }

    pub fn with_browser(mut self, name: &str, factory: impl Fn() -> Result<B> + Send + 'static) -> Self {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Hand cookies and values over to the next browser on a switch.
    pub fn keep_session(mut self, keep: bool) -> Self {
        self.keep_session = keep;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn browser(&mut self) -> &mut B {
        &mut self.current
    }

    pub fn set_browser(&mut self, name: &str) -> Result<()> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("browser '{}'", name)))?;
        let mut next = factory()?;
        if self.keep_session {
            next.load_state(self.current.dump_state())?;
        }
        self.current = next;
        self.name = name.to_string();
        info!(browser = name, "using browser");
        Ok(())
    }

    pub fn call<T>(&mut self, mut f: impl FnMut(&mut B) -> Result<T>) -> Result<T> {
        match f(&mut self.current) {
            Err(Error::SiteSwitch(name)) => {
                self.set_browser(&name)?;
                f(&mut self.current)
            }
            other => other,
        }
    }

    pub fn dump_state(&self) -> SessionState {
        let mut state = self.current.dump_state();
        state
            .values
            .insert(LAST_BROWSER.to_string(), self.name.clone().into());
        state
    }

    /// Start on the browser used last time, then restore its session.
    pub fn load_state(&mut self, state: SessionState) -> Result<bool> {
        let name = state.get_str(LAST_BROWSER).unwrap_or("main").to_string();
        if name != self.name {
            self.set_browser(&name)?;
        }
        self.current.load_state(state)
    }
}
