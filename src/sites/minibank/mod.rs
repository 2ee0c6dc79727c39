// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Online bank with an HTML customer area and a small JSON API for
//! documents and profile.

pub mod browser;
pub mod pages;

use self::browser::{BankBrowser, Kind};
use super::BackendConfig;
use crate::browser::state::Stateful;
use crate::browser::{Request, SessionState};
use crate::capabilities::{
    CapBank, CapBankTransfer, CapDocument, CapProfile, LoginStep, Module, TransferFlow, TransferPhase,
    TransferStep,
};
use crate::error::{Error, Result};
use crate::models::{Account, Document, Profile, Recipient, Subscription, Transaction, Transfer, TransferStatus};
use crate::paginate::Pagination;
use chrono::Duration;
use tracing::info;

pub const NAME: &str = "minibank";

const TRANSFER_FLOW: &str = "transfer_flow";

/// Saved sessions are only worth restoring for a short while.
const STATE_DURATION_MINUTES: i64 = 15;

pub struct MiniBank {
    name: String,
    browser: BankBrowser,
    code: Option<String>,
    flow: TransferFlow,
}

impl MiniBank {
    /// Parameters: `url`, `login`, `password`, and `code` for a pending
    /// second factor.
    pub fn new(backend: &BackendConfig) -> Result<Self> {
        let mut config = backend.browser_config("")?;
        config.state_duration = Some(Duration::minutes(STATE_DURATION_MINUTES));
        let browser = BankBrowser::new(config, backend.require("login")?, backend.require("password")?)?;
        Ok(Self {
            name: backend.name.clone(),
            browser,
            code: backend.param("code").map(str::to_string),
            flow: TransferFlow::default(),
        })
    }

    pub fn set_code(&mut self, code: Option<&str>) {
        self.code = code.map(str::to_string);
    }

    pub fn login(&mut self) -> Result<LoginStep> {
        self.browser.login()
    }

    pub fn send_code(&mut self, code: &str) -> Result<LoginStep> {
        self.browser.send_code(code)
    }

    pub fn transfer_flow(&self) -> &TransferFlow {
        &self.flow
    }

    fn reach(&mut self, kind: Kind, params: &[(&str, &str)]) -> Result<crate::browser::Page<Kind>> {
        let code = self.code.clone();
        self.browser.reach(kind, params, code.as_deref())
    }

    fn operations(&mut self, kind: Kind, account: &Account) -> Result<Vec<Transaction>> {
        let first = self.reach(kind, &[("id", account.id.as_str())])?;
        let start = first.url.clone();
        let spec = pages::operation_list();
        let mut first = Some(first);
        let inner = self.browser.inner();
        Pagination::new(&start, |href: &str| {
            let page = match first.take() {
                Some(page) => page,
                None => inner.location(Request::get(href))?,
            };
            if page.kind != kind {
                return Err(Error::UnexpectedPage(page.url));
            }
            let mut listing = spec.parse(&page)?;
            if let Some(next) = listing.next.take() {
                listing.next = Some(url::Url::parse(&page.url)?.join(&next)?.to_string());
            }
            Ok(listing)
        })
        .collect()
    }

    fn transfer_step(&mut self, page: crate::browser::Page<Kind>) -> Result<TransferStep> {
        let requested = self
            .flow
            .transfer()
            .cloned()
            .ok_or_else(|| Error::TransferInvalid("no transfer in progress".to_string()))?;
        match page.kind {
            Kind::TransferCode if self.flow.phase() == Some(TransferPhase::AwaitingCode) => {
                Err(Error::TransferInvalid(
                    pages::form_error(&page).unwrap_or_else(|| "invalid code".to_string()),
                ))
            }
            Kind::TransferCode => {
                self.flow.await_code()?;
                Ok(TransferStep::NeedCode {
                    prompt: pages::code_prompt(&page),
                })
            }
            Kind::TransferReview => {
                let transfer = pages::transfer_summary(&page, &requested, TransferStatus::Scheduled)?;
                self.flow.validate(transfer.clone())?;
                Ok(TransferStep::Ready(transfer))
            }
            Kind::TransferDone => {
                let transfer = pages::transfer_summary(&page, &requested, TransferStatus::Done)?;
                self.flow.execute(transfer.clone())?;
                info!(id = ?transfer.id, amount = %transfer.amount, "transfer executed");
                Ok(TransferStep::Executed(transfer))
            }
            _ => Err(Error::TransferInvalid(
                pages::form_error(&page).unwrap_or_else(|| format!("unexpected page {}", page.url)),
            )),
        }
    }
}

impl CapBank for MiniBank {
    fn iter_accounts(&mut self) -> Result<Vec<Account>> {
        let page = self.reach(Kind::Accounts, &[])?;
        Ok(pages::account_list().parse(&page)?.items)
    }

    fn iter_history(&mut self, account: &Account) -> Result<Vec<Transaction>> {
        self.operations(Kind::History, account)
    }

    fn iter_coming(&mut self, account: &Account) -> Result<Vec<Transaction>> {
        self.operations(Kind::Coming, account)
    }
}

impl CapBankTransfer for MiniBank {
    fn iter_transfer_recipients(&mut self, account: &Account) -> Result<Vec<Recipient>> {
        let page = self.reach(Kind::Recipients, &[("id", account.id.as_str())])?;
        Ok(pages::recipient_list().parse(&page)?.items)
    }

    fn init_transfer(&mut self, transfer: &Transfer) -> Result<TransferStep> {
        if transfer.amount <= rust_decimal::Decimal::ZERO {
            return Err(Error::TransferInvalid(format!("amount {} is not positive", transfer.amount)));
        }
        self.reach(Kind::Accounts, &[])?;
        self.flow.initiate(transfer.clone())?;
        let mut req = Request::post("transfer/init")
            .form("account", &transfer.account_id)
            .form("recipient", &transfer.recipient_id)
            .form("amount", transfer.amount)
            .form("label", &transfer.label);
        if let Some(date) = transfer.exec_date {
            req = req.form("date", date.format("%d/%m/%Y"));
        }
        let page = self.browser.post(req)?;
        self.transfer_step(page)
    }

    fn confirm_transfer(&mut self, code: &str) -> Result<TransferStep> {
        self.flow
            .expect(&[TransferPhase::AwaitingCode], "no code was requested")?;
        let page = self.browser.post(Request::post("transfer/code").form("code", code))?;
        self.transfer_step(page)
    }

    fn execute_transfer(&mut self) -> Result<TransferStep> {
        self.flow
            .expect(&[TransferPhase::Validated], "transfer is not validated")?;
        let id = self
            .flow
            .transfer()
            .and_then(|t| t.id.clone())
            .unwrap_or_default();
        let page = self.browser.post(Request::post("transfer/execute").form("id", id))?;
        self.transfer_step(page)
    }
}

impl CapDocument for MiniBank {
    fn iter_subscriptions(&mut self) -> Result<Vec<Subscription>> {
        let page = self.reach(Kind::Subscriptions, &[])?;
        Ok(pages::subscription_list().parse(&page)?.items)
    }

    fn iter_documents(&mut self, subscription: &Subscription) -> Result<Vec<Document>> {
        let page = self.reach(Kind::Documents, &[("sub", subscription.id.as_str())])?;
        Ok(pages::document_list().parse(&page)?.items)
    }

    fn download_document(&mut self, document: &Document) -> Result<Vec<u8>> {
        let url = document
            .url
            .clone()
            .ok_or_else(|| Error::NotFound(format!("document {} has no file", document.id)))?;
        let page = self.browser.inner().open(Request::get(&url))?;
        if page.kind == Some(Kind::Login) {
            self.reach(Kind::Accounts, &[])?;
            return Ok(self.browser.inner().open(Request::get(&url))?.into_bytes());
        }
        Ok(page.into_bytes())
    }
}

impl CapProfile for MiniBank {
    fn get_profile(&mut self) -> Result<Profile> {
        let page = self.reach(Kind::Profile, &[])?;
        pages::profile(&page.json()?)
    }
}

impl Module for MiniBank {
    fn name(&self) -> &str {
        &self.name
    }

    fn dump_state(&self) -> SessionState {
        let mut state = self.browser.dump_state();
        state.values.remove(TRANSFER_FLOW);
        if self.flow.phase().is_some() {
            if let Ok(flow) = serde_json::to_value(&self.flow) {
                state.values.insert(TRANSFER_FLOW.to_string(), flow);
            }
        }
        state
    }

    fn load_state(&mut self, state: SessionState) -> Result<bool> {
        let flow = state.values.get(TRANSFER_FLOW).cloned();
        if !self.browser.load_state(state)? {
            return Ok(false);
        }
        if let Some(flow) = flow {
            self.flow = serde_json::from_value(flow)?;
        }
        Ok(true)
    }

    fn as_bank(&mut self) -> Option<&mut dyn CapBank> {
        Some(self)
    }

    fn as_transfer(&mut self) -> Option<&mut dyn CapBankTransfer> {
        Some(self)
    }

    fn as_documents(&mut self) -> Option<&mut dyn CapDocument> {
        Some(self)
    }

    fn as_profile(&mut self) -> Option<&mut dyn CapProfile> {
        Some(self)
    }
}
