// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Error;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rust_decimal::Decimal;

/// Which character separates decimals in a raw amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalStyle {
    /// `1 234,56` or `1.234,56`
    French,
    /// `1,234.56`
    English,
    /// The last separator is the decimal one, unless it repeats.
    Auto,
}

/// Collapse whitespace runs (NBSP included) into single spaces and trim.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws && !out.is_empty() {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out.trim_end().to_string()
}

/// Turn a raw website amount ("- 1 234,56 €", "+12.30 EUR") into a decimal.
pub fn clean_decimal(raw: &str, style: DecimalStyle) -> Result<Decimal, Error> {
    let mut negative = false;
    let mut body = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '0'..='9' | ',' | '.' => body.push(ch),
            '-' | '\u{2212}' => negative = true,
            _ => {}
        }
    }
    let body = body.trim_end_matches([',', '.']);
    if !body.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::field_parse("amount", raw, "no digits"));
    }
    // ",50" is half a unit
    let body = if body.starts_with([',', '.']) {
        format!("0{}", body)
    } else {
        body.to_string()
    };

    let normalized = match style {
        DecimalStyle::French => body.replace('.', "").replace(',', "."),
        DecimalStyle::English => body.replace(',', ""),
        DecimalStyle::Auto => {
            let last = body.rfind([',', '.']);
            match last {
                Some(idx) => {
                    let sep = body.as_bytes()[idx] as char;
                    if body.matches(sep).count() > 1 {
                        body.replace([',', '.'], "")
                    } else {
                        let (int, frac) = body.split_at(idx);
                        format!("{}.{}", int.replace([',', '.'], ""), &frac[1..])
                    }
                }
                None => body,
            }
        }
    };

    let value = normalized
        .parse::<Decimal>()
        .map_err(|e| Error::field_parse("amount", raw, e))?;
    Ok(if negative { -value } else { value })
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {}", ccy, d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
