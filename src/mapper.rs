// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Site vocabulary to shared taxonomy.
//!
//! Nothing here fails on unknown input: unmapped values fall back to the
//! table's unknown kind and are logged.

use crate::error::{Error, Result};
use crate::models::{AccountType, DocumentType, Transaction, TransactionType};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Result of running a raw label through a [`PatternTable`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classified<K> {
    pub kind: K,
    pub matched: bool,
    pub category: Option<String>,
    pub text: Option<String>,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// Ordered regex rows; each row is anchored at the start of the label.
#[derive(Debug, Clone)]
pub struct PatternTable<K> {
    rows: Vec<(Regex, K)>,
}

impl<K: Copy + Default + fmt::Debug> PatternTable<K> {
    pub fn new(rows: &[(&str, K)]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|(pattern, kind)| {
                Regex::new(&format!("^(?:{})", pattern))
                    .map(|re| (re, *kind))
                    .map_err(|e| Error::Data(format!("bad pattern '{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn classify(&self, raw: &str) -> Classified<K> {
        for (re, kind) in &self.rows {
            let Some(caps) = re.captures(raw) else {
                continue;
            };
            let group = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());
            let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<i64>().ok());
            return Classified {
                kind: *kind,
                matched: true,
                category: group("category"),
                text: group("text").filter(|t| !t.is_empty()),
                day: number("dd").map(|d| d as u32),
                month: number("mm").map(|m| m as u32),
                year: number("yy").map(|y| y as i32),
            };
        }
        warn!(raw = %raw, "unknown label");
        Classified::default()
    }
}

const FRENCH_ROWS: &[(&str, TransactionType)] = &[
    (r"(?P<category>CB) (?P<text>RETRAIT) DU (?P<dd>\d+)/(?P<mm>\d+)", TransactionType::Withdrawal),
    (r"(?P<category>(PRLV|PE)( SEPA)?) (?P<text>.*)", TransactionType::Order),
    (r"(?P<category>CHQ\.) (?P<text>.*)", TransactionType::Check),
    (r"(?P<category>RELEVE CB) AU (\d+)/(\d+)/(\d+)", TransactionType::CardSummary),
    (r"(?P<category>CB) (?P<text>.*) (?P<dd>\d+)/(?P<mm>\d+)/(?P<yy>\d+)", TransactionType::Card),
    (r"(?P<category>CARTE) (?P<dd>\d{2})/(?P<mm>\d{2}) (?P<text>.*)", TransactionType::Card),
    (r"(?P<category>(RETRAIT DAB|RET DAB)) (?P<dd>\d{2})/(?P<mm>\d{2}) (?P<text>.*)", TransactionType::Withdrawal),
    (r"(?P<category>(PRELEVEMENT|TELEREGLEMENT|TIP)) (?P<text>.*)", TransactionType::Order),
    (r"(?P<category>(ECHEANCE\s*)?PRET)(?P<text>.*)", TransactionType::LoanPayment),
    (
        r"(TP-\d+-)?(?P<category>(EVI|VIR(EM(EN)?)?T?)(.PERMANENT)? ((RECU|FAVEUR) TIERS|SEPA RECU)?)( /FRM)?(?P<text>.*)",
        TransactionType::Transfer,
    ),
    (r"(?P<category>REMBOURST)(?P<text>.*)", TransactionType::Payback),
    (r"(?P<category>COM(MISSIONS?)?)(?P<text>.*)", TransactionType::Bank),
    (r"(?P<text>(?P<category>REMUNERATION).*)", TransactionType::Bank),
    (r"(?P<text>(?P<category>ABON.*?)\s*.*)", TransactionType::Bank),
    (r"(?P<text>(?P<category>RESULTAT .*?)\s*.*)", TransactionType::Bank),
    (r"(?P<text>(?P<category>TRAIT\..*?)\s*.*)", TransactionType::Bank),
    (r"(?P<text>(?P<category>COTISATION).*)", TransactionType::Bank),
    (r"(?P<text>(?P<category>INTERETS).*)", TransactionType::Bank),
    (r"(?P<category>REM CHQ) (?P<text>.*)", TransactionType::Deposit),
    (r"VIREMENT.*", TransactionType::Transfer),
    (r".*(PRELEVEMENTS|PRELVT|TIP).*", TransactionType::Order),
    (r".*CHEQUE.*", TransactionType::Check),
    (r".*ESPECES.*", TransactionType::Deposit),
    (r".*(CARTE|CB).*", TransactionType::Card),
    (r".*(AGIOS|ANNULATIONS|IMPAYES|CREDIT).*", TransactionType::Bank),
    (r".*(FRAIS DE TENUE DE COMPTE).*", TransactionType::Bank),
    (r".*\b(RETRAIT)\b.*", TransactionType::Withdrawal),
];

static FRENCH: Lazy<PatternTable<TransactionType>> = Lazy::new(|| PatternTable::new(FRENCH_ROWS).unwrap());

/// Wording used by most French retail banks.
pub fn french_patterns() -> &'static PatternTable<TransactionType> {
    &FRENCH
}

/// Fill `kind`, `category`, `label` and `rdate` of `tr` from its raw label.
///
/// Without a year in the label, the operation date falls in the year of
/// `tr.date`, or the year before when that would put it after `tr.date`.
pub fn apply_patterns(tr: &mut Transaction, table: &PatternTable<TransactionType>) {
    if tr.label.is_empty() {
        tr.label = tr.raw.clone();
    }
    let found = table.classify(&tr.raw);
    if !found.matched {
        return;
    }
    tr.kind = found.kind;
    if let Some(text) = found.text {
        tr.label = text;
    }
    if let Some(category) = found.category {
        tr.category = Some(category);
    }
    let (Some(dd), Some(mm)) = (found.day, found.month) else {
        return;
    };
    let year = match (found.year, tr.date) {
        (Some(yy), _) if yy < 100 => Some(yy + 2000),
        (Some(yy), _) => Some(yy),
        (None, Some(date)) => {
            let guess = date.with_month(mm).and_then(|d| d.with_day(dd)).unwrap_or(date);
            Some(if guess > date { date.year() - 1 } else { date.year() })
        }
        (None, None) => None,
    };
    match year.and_then(|y| NaiveDate::from_ymd_opt(y, mm, dd)) {
        Some(rdate) => tr.rdate = Some(rdate),
        None => warn!(raw = %tr.raw, "unable to date operation"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Exact,
    Contains,
}

/// Case-insensitive word table with an explicit fallback.
#[derive(Debug, Clone)]
pub struct VocabMap<K> {
    entries: Vec<(String, K)>,
    fallback: K,
    lookup: Lookup,
}

impl<K: Copy + fmt::Debug> VocabMap<K> {
    /// Keys must equal the whole (trimmed) value.
    pub fn new(entries: &[(&str, K)], fallback: K) -> Self {
        Self {
            entries: entries.iter().map(|(k, v)| (k.to_lowercase(), *v)).collect(),
            fallback,
            lookup: Lookup::Exact,
        }
    }

    /// First key contained in the value wins; list specific keys first.
    pub fn containing(entries: &[(&str, K)], fallback: K) -> Self {
        Self {
            lookup: Lookup::Contains,
            ..Self::new(entries, fallback)
        }
    }

    pub fn try_get(&self, value: &str) -> Option<K> {
        let needle = value.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| match self.lookup {
                Lookup::Exact => *k == needle,
                Lookup::Contains => needle.contains(k.as_str()),
            })
            .map(|(_, v)| *v)
    }

    pub fn get(&self, value: &str) -> K {
        self.try_get(value).unwrap_or_else(|| {
            warn!(value = %value, fallback = ?self.fallback, "unmapped value");
            self.fallback
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Account labels as French banks print them.
pub fn account_type_vocab() -> VocabMap<AccountType> {
    VocabMap::containing(
        &[
            ("compte joint", AccountType::Joint),
            ("compte courant", AccountType::Checking),
            ("compte de dépôt", AccountType::Checking),
            ("compte cheque", AccountType::Checking),
            ("compte chèque", AccountType::Checking),
            ("cpt courant", AccountType::Checking),
            ("compte à terme", AccountType::Deposit),
            ("compte a terme", AccountType::Deposit),
            ("livret", AccountType::Savings),
            ("ldd", AccountType::Savings),
            ("lep", AccountType::Savings),
            ("épargne", AccountType::Savings),
            ("epargne", AccountType::Savings),
            ("pea", AccountType::Pea),
            ("compte titres", AccountType::Market),
            ("compte-titres", AccountType::Market),
            ("assurance vie", AccountType::LifeInsurance),
            ("assurance-vie", AccountType::LifeInsurance),
            ("prêt immobilier", AccountType::Mortgage),
            ("pret immobilier", AccountType::Mortgage),
            ("crédit renouvelable", AccountType::RevolvingCredit),
            ("credit renouvelable", AccountType::RevolvingCredit),
            ("revolving", AccountType::RevolvingCredit),
            ("consommation", AccountType::ConsumerCredit),
            ("prêt", AccountType::Loan),
            ("pret", AccountType::Loan),
            ("carte", AccountType::Card),
        ],
        AccountType::Unknown,
    )
}

pub fn document_type_vocab() -> VocabMap<DocumentType> {
    VocabMap::containing(
        &[
            ("relevé d'identité", DocumentType::Rib),
            ("rib", DocumentType::Rib),
            ("relevé", DocumentType::Statement),
            ("releve", DocumentType::Statement),
            ("contrat", DocumentType::Contract),
            ("attestation", DocumentType::Certificate),
            ("certificat", DocumentType::Certificate),
            ("avis", DocumentType::Notice),
            ("rapport", DocumentType::Report),
            ("facture", DocumentType::Bill),
        ],
        DocumentType::Other,
    )
}
