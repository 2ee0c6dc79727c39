// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::pages;
use crate::browser::state::Stateful;
use crate::browser::{Browser, BrowserConfig, Page, Request, Router, SessionState, UrlPattern};
use crate::capabilities::LoginStep;
use crate::error::{Error, Result};
use tracing::{debug, info};

const OTP_PENDING: &str = "otp_pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Login,
    Otp,
    Maintenance,
    History,
    Coming,
    Recipients,
    Accounts,
    TransferCode,
    TransferReview,
    TransferDone,
    Documents,
    Subscriptions,
    Profile,
}

fn router() -> Router<Kind> {
    Router::new()
        .route(Kind::Login, UrlPattern::one("login"))
        .route(Kind::Otp, UrlPattern::one("otp"))
        .route(Kind::Maintenance, UrlPattern::one("maintenance"))
        .route(Kind::History, UrlPattern::one(r"accounts/(?P<id>\w+)/history"))
        .route(Kind::Coming, UrlPattern::one(r"accounts/(?P<id>\w+)/coming"))
        .route(Kind::Recipients, UrlPattern::one(r"accounts/(?P<id>\w+)/recipients"))
        .route(Kind::Accounts, UrlPattern::one("accounts"))
        .route(Kind::TransferCode, UrlPattern::one("transfer/code"))
        .route(Kind::TransferReview, UrlPattern::one("transfer/review"))
        .route(Kind::TransferDone, UrlPattern::one("transfer/done"))
        .route(
            Kind::Documents,
            UrlPattern::one(r"api/subscriptions/(?P<sub>\w+)/documents"),
        )
        .route(Kind::Subscriptions, UrlPattern::one("api/subscriptions"))
        .route(Kind::Profile, UrlPattern::one("api/profile"))
}

/// Session on the bank website: login with optional OTP, then navigation
/// that logs in again whenever the site bounces to the login form.
pub struct BankBrowser {
    inner: Browser<Kind>,
    username: String,
    password: String,
}

impl BankBrowser {
    pub fn new(config: BrowserConfig, username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            inner: Browser::new(config, router())?,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn inner(&mut self) -> &mut Browser<Kind> {
        &mut self.inner
    }

    pub fn otp_pending(&self) -> bool {
        self.inner
            .state_get(OTP_PENDING)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn landing(&mut self, page: &Page<Kind>) -> Result<LoginStep> {
        match page.kind {
            Kind::Otp => {
                self.inner.state_set(OTP_PENDING, true);
                let prompt = pages::code_prompt(page);
                info!(prompt = %prompt, "second factor required");
                Ok(LoginStep::NeedCode { prompt })
            }
            Kind::Login => match pages::form_error(page) {
                Some(msg) => Err(Error::IncorrectPassword(msg)),
                None => Err(Error::UnexpectedPage(page.url.clone())),
            },
            Kind::Maintenance => Err(Error::BrowserUnavailable(pages::maintenance_message(page))),
            _ => {
                self.inner.state_remove(OTP_PENDING);
                Ok(LoginStep::Done)
            }
        }
    }

    pub fn login(&mut self) -> Result<LoginStep> {
        debug!(user = %self.username, "logging in");
        let req = Request::post("login")
            .form("username", &self.username)
            .form("password", &self.password);
        let page = self.inner.location(req)?;
        self.landing(&page)
    }

    /// Second step of the login, possibly in a later process.
    pub fn send_code(&mut self, code: &str) -> Result<LoginStep> {
        if !self.otp_pending() {
            return Err(Error::State("no code was requested".to_string()));
        }
        let page = self.inner.location(Request::post("otp").form("code", code))?;
        match page.kind {
            Kind::Otp => Err(Error::IncorrectPassword(
                pages::form_error(&page).unwrap_or_else(|| "invalid code".to_string()),
            )),
            _ => self.landing(&page),
        }
    }

    /// Go to `kind`, logging in first when the site asks for it. A pending
    /// second factor is sent with `code` when one is given.
    pub fn reach(&mut self, kind: Kind, params: &[(&str, &str)], code: Option<&str>) -> Result<Page<Kind>> {
        let page = self.inner.go(kind, params)?;
        match page.kind {
            k if k == kind => return Ok(page),
            Kind::Login | Kind::Otp => {}
            Kind::Maintenance => return Err(Error::BrowserUnavailable(pages::maintenance_message(&page))),
            _ => return Err(Error::UnexpectedPage(page.url)),
        }

        let step = if page.kind == Kind::Otp && self.otp_pending() {
            LoginStep::NeedCode {
                prompt: pages::code_prompt(&page),
            }
        } else {
            self.login()?
        };
        if let LoginStep::NeedCode { prompt } = step {
            match code {
                Some(code) => {
                    self.send_code(code)?;
                }
                None => return Err(Error::ActionNeeded(prompt)),
            }
        }

        let page = self.inner.go(kind, params)?;
        if page.kind != kind {
            return Err(Error::UnexpectedPage(page.url));
        }
        Ok(page)
    }

    pub fn post(&mut self, req: Request) -> Result<Page<Kind>> {
        self.inner.location(req)
    }
}

impl Stateful for BankBrowser {
    fn dump_state(&self) -> SessionState {
        self.inner.dump_state()
    }

    fn load_state(&mut self, state: SessionState) -> Result<bool> {
        self.inner.load_state(state)
    }
}
