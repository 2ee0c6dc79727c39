// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use sitekit::dates::{parse_dmy, parse_french_date, LinearDateGuesser};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn parse_dmy_accepts_common_separators() {
    assert_eq!(parse_dmy("05/03/2024").unwrap(), d(2024, 3, 5));
    assert_eq!(parse_dmy("5.3.2024").unwrap(), d(2024, 3, 5));
    assert_eq!(parse_dmy(" 31-12-23 ").unwrap(), d(2023, 12, 31));
    assert!(parse_dmy("31/02/2024").is_err());
    assert!(parse_dmy("2024-03-05").is_err());
}

#[test]
fn parse_french_date_reads_month_names() {
    assert_eq!(parse_french_date("12 janvier 2024").unwrap(), d(2024, 1, 12));
    assert_eq!(parse_french_date("1er févr. 2024").unwrap(), d(2024, 2, 1));
    assert_eq!(parse_french_date("3 aout 2023").unwrap(), d(2023, 8, 3));
    assert_eq!(parse_french_date("le 25 décembre 2022").unwrap(), d(2022, 12, 25));
    assert!(parse_french_date("25 brumaire 2022").is_err());
}

#[test]
fn guesser_walks_back_through_years() {
    let mut g = LinearDateGuesser::new(d(2024, 2, 10));
    assert_eq!(g.guess(5, 2), Some(d(2024, 2, 5)));
    assert_eq!(g.guess(20, 12), Some(d(2023, 12, 20)));
    assert_eq!(g.current(), d(2023, 12, 20));
    assert_eq!(g.guess(3, 11), Some(d(2023, 11, 3)));
}

#[test]
fn guesser_accepts_slightly_future_dates() {
    let mut g = LinearDateGuesser::new(d(2024, 2, 10));
    assert_eq!(g.guess(1, 3), Some(d(2024, 3, 1)));
    // a future date does not move the reference
    assert_eq!(g.current(), d(2024, 2, 10));
}

#[test]
fn guesser_finds_the_last_leap_year() {
    let mut g = LinearDateGuesser::new(d(2023, 6, 1));
    assert_eq!(g.guess(29, 2), Some(d(2020, 2, 29)));
}
