// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use sitekit::mapper::{account_type_vocab, apply_patterns, document_type_vocab, french_patterns, PatternTable, VocabMap};
use sitekit::models::{AccountType, DocumentType, Transaction, TransactionType};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn classified(raw: &str, date: NaiveDate) -> Transaction {
    let mut tr = Transaction {
        raw: raw.to_string(),
        date: Some(date),
        ..Default::default()
    };
    apply_patterns(&mut tr, french_patterns());
    tr
}

#[test]
fn french_labels_map_to_transaction_types() {
    let cases = [
        ("VIREMENT SEPA RECU", TransactionType::Transfer),
        ("VIR SEPA RECU /FRM ACME PAYROLL", TransactionType::Transfer),
        ("PRLV SEPA EDF CLIENTS", TransactionType::Order),
        ("CHQ. 1234567", TransactionType::Check),
        ("CB RETRAIT DU 12/03", TransactionType::Withdrawal),
        ("CB CARREFOUR 12/03/24", TransactionType::Card),
        ("CARTE 05/03 BOULANGERIE", TransactionType::Card),
        ("RETRAIT DAB 05/03 PARIS", TransactionType::Withdrawal),
        ("RELEVE CB AU 31/03/2024", TransactionType::CardSummary),
        ("ECHEANCE PRET 0012345", TransactionType::LoanPayment),
        ("COMMISSIONS TENUE", TransactionType::Bank),
        ("REM CHQ 0042", TransactionType::Deposit),
        ("VERSEMENT ESPECES", TransactionType::Deposit),
        ("QUELQUE CHOSE D'AUTRE", TransactionType::Unknown),
    ];
    for (raw, kind) in cases {
        assert_eq!(classified(raw, d(2024, 3, 20)).kind, kind, "{}", raw);
    }
}

#[test]
fn transfer_without_text_keeps_the_raw_label() {
    let tr = classified("VIREMENT SEPA RECU", d(2024, 3, 20));
    assert_eq!(tr.label, "VIREMENT SEPA RECU");
    assert_eq!(tr.category.as_deref(), Some("VIREMENT SEPA RECU"));
}

#[test]
fn captured_text_becomes_the_label() {
    let tr = classified("PRLV SEPA EDF CLIENTS", d(2024, 3, 20));
    assert_eq!(tr.label, "EDF CLIENTS");
    assert_eq!(tr.category.as_deref(), Some("PRLV SEPA"));
}

#[test]
fn unknown_label_keeps_defaults() {
    let tr = classified("QUELQUE CHOSE D'AUTRE", d(2024, 3, 20));
    assert_eq!(tr.label, "QUELQUE CHOSE D'AUTRE");
    assert_eq!(tr.category, None);
    assert_eq!(tr.rdate, None);
}

#[test]
fn operation_date_is_read_from_the_label() {
    assert_eq!(classified("CB CARREFOUR 12/03/24", d(2024, 3, 14)).rdate, Some(d(2024, 3, 12)));
    assert_eq!(classified("CARTE 05/03 BOULANGERIE", d(2024, 3, 7)).rdate, Some(d(2024, 3, 5)));
    // December purchase debited in January
    assert_eq!(classified("CARTE 28/12 LIBRAIRIE", d(2024, 1, 3)).rdate, Some(d(2023, 12, 28)));
}

#[test]
fn impossible_operation_date_is_left_empty() {
    for raw in ["CARTE 31/02 X", "CARTE 00/03 X"] {
        let tr = classified(raw, d(2024, 3, 7));
        assert_eq!(tr.kind, TransactionType::Card, "{}", raw);
        assert_eq!(tr.rdate, None, "{}", raw);
    }
}

#[test]
fn pattern_rows_are_tried_in_order() {
    let table = PatternTable::new(&[
        (r"(?P<category>VIR) (?P<text>.*)", TransactionType::Transfer),
        (r"VIR.*", TransactionType::Bank),
    ])
    .unwrap();
    assert_eq!(table.len(), 2);
    let c = table.classify("VIR LOYER");
    assert!(c.matched);
    assert_eq!(c.kind, TransactionType::Transfer);
    assert_eq!(c.text.as_deref(), Some("LOYER"));
    // anchored at the start
    assert!(!table.classify("X VIR LOYER").matched);
    assert!(PatternTable::<TransactionType>::new(&[("(", TransactionType::Bank)]).is_err());
}

#[test]
fn vocab_maps_fall_back_on_unknown_words() {
    let exact = VocabMap::new(&[("102", 2u8), ("101", 1u8)], 0u8);
    assert_eq!(exact.get(" 101 "), 1);
    assert_eq!(exact.try_get("1010"), None);
    assert_eq!(exact.get("999"), 0);

    let accounts = account_type_vocab();
    assert_eq!(accounts.get("COMPTE COURANT M. DUPONT"), AccountType::Checking);
    assert_eq!(accounts.get("Livret A"), AccountType::Savings);
    assert_eq!(accounts.get("Compte joint"), AccountType::Joint);
    assert_eq!(accounts.get("Prêt immobilier 2019"), AccountType::Mortgage);
    assert_eq!(accounts.get("Mystère"), AccountType::Unknown);

    let docs = document_type_vocab();
    assert_eq!(docs.get("Relevé de compte mars"), DocumentType::Statement);
    assert_eq!(docs.get("Relevé d'identité bancaire"), DocumentType::Rib);
    assert_eq!(docs.get("Photo"), DocumentType::Other);
}
