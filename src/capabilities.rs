// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Capability contracts a site module may implement.
//!
//! Every verb is a blocking call that navigates, parses and returns fresh
//! records. Multi-step flows return a step value telling the caller whether
//! user input (an OTP, an SMS code) is needed before the next call.

use crate::browser::SessionState;
use crate::error::{Error, Result};
use crate::models::{Account, Document, Parcel, Profile, Recipient, Subscription, Transaction, Transfer};
use serde::{Deserialize, Serialize};

/// Outcome of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginStep {
    Done,
    /// Call again with the code the user received.
    NeedCode { prompt: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransferStep {
    /// Validated by the site, waiting for `execute_transfer`.
    Ready(Transfer),
    NeedCode { prompt: String },
    Executed(Transfer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Initiated,
    AwaitingCode,
    Validated,
    Executed,
}

/// Guards the order of transfer calls: init, optional code, execute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferFlow {
    phase: Option<TransferPhase>,
    transfer: Option<Transfer>,
}

impl TransferFlow {
    pub fn phase(&self) -> Option<TransferPhase> {
        self.phase
    }

    pub fn transfer(&self) -> Option<&Transfer> {
        self.transfer.as_ref()
    }

    /// Starting over discards any transfer in progress.
    pub fn initiate(&mut self, transfer: Transfer) -> Result<()> {
        self.phase = Some(TransferPhase::Initiated);
        self.transfer = Some(transfer);
        Ok(())
    }

    pub fn await_code(&mut self) -> Result<()> {
        self.expect(&[TransferPhase::Initiated], "no transfer to confirm")?;
        self.phase = Some(TransferPhase::AwaitingCode);
        Ok(())
    }

    pub fn validate(&mut self, transfer: Transfer) -> Result<()> {
        self.expect(
            &[TransferPhase::Initiated, TransferPhase::AwaitingCode],
            "no transfer to validate",
        )?;
        self.phase = Some(TransferPhase::Validated);
        self.transfer = Some(transfer);
        Ok(())
    }

    pub fn execute(&mut self, transfer: Transfer) -> Result<()> {
        self.expect(&[TransferPhase::Validated], "transfer is not validated")?;
        self.phase = Some(TransferPhase::Executed);
        self.transfer = Some(transfer);
        Ok(())
    }

    pub fn expect(&self, allowed: &[TransferPhase], msg: &str) -> Result<()> {
        match self.phase {
            Some(p) if allowed.contains(&p) => Ok(()),
            other => Err(Error::TransferInvalid(format!("{} (state: {:?})", msg, other))),
        }
    }
}

pub trait CapBank {
    fn iter_accounts(&mut self) -> Result<Vec<Account>>;

    fn get_account(&mut self, id: &str) -> Result<Account> {
        self.iter_accounts()?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))
    }

    fn iter_history(&mut self, account: &Account) -> Result<Vec<Transaction>>;

    fn iter_coming(&mut self, account: &Account) -> Result<Vec<Transaction>>;
}

pub trait CapBankTransfer {
    fn iter_transfer_recipients(&mut self, account: &Account) -> Result<Vec<Recipient>>;

    fn init_transfer(&mut self, transfer: &Transfer) -> Result<TransferStep>;

    fn confirm_transfer(&mut self, code: &str) -> Result<TransferStep>;

    fn execute_transfer(&mut self) -> Result<TransferStep>;
}

pub trait CapDocument {
    fn iter_subscriptions(&mut self) -> Result<Vec<Subscription>>;

    fn iter_documents(&mut self, subscription: &Subscription) -> Result<Vec<Document>>;

    fn download_document(&mut self, document: &Document) -> Result<Vec<u8>>;
}

pub trait CapProfile {
    fn get_profile(&mut self) -> Result<Profile>;
}

pub trait CapParcel {
    fn get_parcel_tracking(&mut self, id: &str) -> Result<Parcel>;
}

/// A loaded site module. Capabilities it lacks answer `None`.
pub trait Module: Send {
    fn name(&self) -> &str;

    fn dump_state(&self) -> SessionState;

    /// `Ok(false)` when the saved session was ignored.
    fn load_state(&mut self, state: SessionState) -> Result<bool>;

    fn as_bank(&mut self) -> Option<&mut dyn CapBank> {
        None
    }

    fn as_transfer(&mut self) -> Option<&mut dyn CapBankTransfer> {
        None
    }

    fn as_documents(&mut self) -> Option<&mut dyn CapDocument> {
        None
    }

    fn as_profile(&mut self) -> Option<&mut dyn CapProfile> {
        None
    }

    fn as_parcel(&mut self) -> Option<&mut dyn CapParcel> {
        None
    }
}

/// Capability accessor that turns `None` into a `NotFound` error.
pub fn require<'a, C: ?Sized>(cap: Option<&'a mut C>, module: &str, what: &str) -> Result<&'a mut C> {
    cap.ok_or_else(|| Error::NotFound(format!("module {} has no {} capability", module, what)))
}
