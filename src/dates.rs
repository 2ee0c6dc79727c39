// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Date helpers for sites that print day-first or French dates, or omit the year.

use crate::error::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static DMY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2})\s*[/.\-]\s*(\d{1,2})\s*[/.\-]\s*(\d{4}|\d{2})\s*$").unwrap()
});

static FRENCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2})(?:er)?\s+([[:alpha:]éèêûô]+)\.?\s+(\d{4})").unwrap()
});

const FRENCH_MONTHS: [(&str, u32); 12] = [
    ("janv", 1),
    ("f", 2),
    ("mars", 3),
    ("avr", 4),
    ("mai", 5),
    ("juin", 6),
    ("juil", 7),
    ("ao", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("d", 12),
];

fn french_month(word: &str) -> Option<u32> {
    let w = word.to_lowercase();
    if w == "jan" {
        return Some(1);
    }
    FRENCH_MONTHS
        .iter()
        .find(|(prefix, _)| w.starts_with(prefix))
        .map(|(_, m)| *m)
}

/// `dd/mm/yyyy`, `dd/mm/yy`, `dd.mm.yyyy` or `dd-mm-yyyy`.
pub fn parse_dmy(s: &str) -> Result<NaiveDate> {
    let caps = DMY
        .captures(s)
        .ok_or_else(|| Error::field_parse("date", s, "expected dd/mm/yyyy"))?;
    let day: u32 = caps[1].parse().unwrap_or(0);
    let month: u32 = caps[2].parse().unwrap_or(0);
    let mut year: i32 = caps[3].parse().unwrap_or(0);
    if caps[3].len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::field_parse("date", s, "no such day"))
}

/// "12 janvier 2024", "1er févr. 2024", "3 aout 2023".
pub fn parse_french_date(s: &str) -> Result<NaiveDate> {
    let caps = FRENCH
        .captures(s)
        .ok_or_else(|| Error::field_parse("date", s, "expected a French date"))?;
    let day: u32 = caps[1].parse().unwrap_or(0);
    let month = french_month(&caps[2])
        .ok_or_else(|| Error::field_parse("date", s, "unknown month name"))?;
    let year: i32 = caps[3].parse().unwrap_or(0);
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::field_parse("date", s, "no such day"))
}

/// Guess years for day/month pairs listed from the most recent to the oldest.
///
/// Dates slightly in the future (up to `max_bump`) are accepted as-is;
/// anything further ahead belongs to the previous year.
#[derive(Debug, Clone)]
pub struct LinearDateGuesser {
    current: NaiveDate,
    max_bump: Duration,
}

impl LinearDateGuesser {
    pub fn new(current: NaiveDate) -> Self {
        Self {
            current,
            max_bump: Duration::days(31),
        }
    }

    pub fn with_max_bump(mut self, max_bump: Duration) -> Self {
        self.max_bump = max_bump;
        self
    }

    pub fn current(&self) -> NaiveDate {
        self.current
    }

    fn try_assigning_year(day: u32, month: u32, start: i32, max: i32) -> Option<NaiveDate> {
        let mut year = start;
        loop {
            if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(d);
            }
            if year == max {
                return None;
            }
            year += (max - year).signum();
        }
    }

    pub fn guess(&mut self, day: u32, month: u32) -> Option<NaiveDate> {
        let today = self.current;
        let naive = Self::try_assigning_year(day, month, today.year(), today.year() - 5)?;
        if naive.year() != today.year() {
            // 29/02 pushed us into another year
            self.current = naive;
            return Some(naive);
        }

        if naive > today + self.max_bump {
            let parsed = NaiveDate::from_ymd_opt(today.year() - 1, month, day)?;
            self.current = parsed;
            Some(parsed)
        } else if naive > today {
            Some(naive)
        } else {
            self.current = naive;
            Some(naive)
        }
    }
}
