// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Implements `Display` with the serde snake_case name of each variant.
macro_rules! display_as_serde {
    ($($t:ty),* $(,)?) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let v = serde_json::to_value(self).map_err(|_| fmt::Error)?;
                    f.write_str(v.as_str().unwrap_or_default())
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Unknown,
    Checking,
    Savings,
    Deposit,
    Loan,
    Market,
    Joint,
    Card,
    LifeInsurance,
    Pea,
    Mortgage,
    ConsumerCredit,
    RevolvingCredit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Owner,
    CoOwner,
    Attorney,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub label: String,
    pub kind: AccountType,
    pub balance: Decimal,
    pub currency: String,
    pub ownership: Option<Ownership>,
    pub iban: Option<String>,
    pub coming: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Unknown,
    Transfer,
    Order,
    Check,
    Deposit,
    Payback,
    Withdrawal,
    Card,
    LoanPayment,
    Bank,
    CardSummary,
    DeferredCard,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: Option<NaiveDate>,
    /// Date the operation was made, when the label carries one.
    pub rdate: Option<NaiveDate>,
    pub raw: String,
    pub label: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub kind: TransactionType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub label: String,
    pub iban: Option<String>,
    pub bank_name: Option<String>,
    pub enabled_at: Option<NaiveDate>,
}

/// An account allowed to send transfers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    pub id: String,
    pub label: String,
    pub currency: String,
    pub balance: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    #[default]
    Draft,
    Scheduled,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Option<String>,
    pub account_id: String,
    pub recipient_id: String,
    pub amount: Decimal,
    pub label: String,
    pub exec_date: Option<NaiveDate>,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub label: String,
    pub subscriber: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Rib,
    Statement,
    Contract,
    Certificate,
    Notice,
    Report,
    Bill,
    #[default]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub label: String,
    pub kind: DocumentType,
    pub format: String,
    pub url: Option<String>,
    pub has_file: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    #[default]
    Unknown,
    Planned,
    InTransit,
    Arrived,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelEvent {
    pub date: Option<chrono::NaiveDateTime>,
    pub location: String,
    pub activity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: String,
    pub status: ParcelStatus,
    pub info: String,
    pub history: Vec<ParcelEvent>,
}

display_as_serde!(
    AccountType,
    Ownership,
    TransactionType,
    TransferStatus,
    DocumentType,
    ParcelStatus,
);
