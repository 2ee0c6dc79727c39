// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;

pub type Params = BTreeMap<String, String>;

/// One or more URL regexes, absolute or relative to the browser base URL.
///
/// Matching is anchored at the start of the URL only, so `/account` also
/// matches `/account?id=3`. Named groups (`(?P<id>\d+)`) are captured on
/// match and substituted on build.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    patterns: Vec<String>,
    base: Option<String>,
}

impl UrlPattern {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            base: None,
        }
    }

    pub fn one(pattern: &str) -> Self {
        Self::new([pattern])
    }

    /// Resolve relative patterns against this base instead of the browser's.
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    fn is_absolute(pattern: &str) -> bool {
        let p = pattern.trim_start_matches('^');
        p.starts_with("http://") || p.starts_with("https://") || p.starts_with("https?://")
    }

    fn prefix(&self, pattern: &str, base: Option<&str>) -> Result<Option<String>> {
        if Self::is_absolute(pattern) {
            return Ok(None);
        }
        let base = self
            .base
            .as_deref()
            .or(base)
            .ok_or_else(|| Error::UrlNotResolvable(format!("'{}' is relative and no base URL is set", pattern)))?;
        if pattern.starts_with('/') {
            let parsed = url::Url::parse(base)?;
            Ok(Some(parsed.origin().ascii_serialization()))
        } else if base.ends_with('/') {
            Ok(Some(base.to_string()))
        } else {
            Ok(Some(format!("{}/", base)))
        }
    }

    /// Named parameters captured by the first matching pattern, if any.
    pub fn matches(&self, url: &str, base: Option<&str>) -> Result<Option<Params>> {
        for pattern in &self.patterns {
            let body = pattern.trim_start_matches('^');
            let full = match self.prefix(pattern, base)? {
                Some(prefix) => format!("^{}{}", regex::escape(&prefix), body),
                None => format!("^{}", body),
            };
            let re = Regex::new(&full)
                .map_err(|e| Error::UrlNotResolvable(format!("bad pattern '{}': {}", pattern, e)))?;
            if let Some(caps) = re.captures(url) {
                let mut params = Params::new();
                for name in re.capture_names().flatten() {
                    if let Some(m) = caps.name(name) {
                        params.insert(name.to_string(), m.as_str().to_string());
                    }
                }
                return Ok(Some(params));
            }
        }
        Ok(None)
    }

    /// Build a concrete URL from the first pattern whose named groups are
    /// exactly the given parameters.
    pub fn build(&self, base: Option<&str>, params: &[(&str, &str)]) -> Result<String> {
        let mut wanted: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        wanted.sort_unstable();
        wanted.dedup();

        for pattern in &self.patterns {
            let groups = named_groups(pattern);
            let mut names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
            names.sort_unstable();
            names.dedup();
            if names != wanted {
                continue;
            }

            let mut out = String::with_capacity(pattern.len());
            let mut last = 0;
            for g in &groups {
                out.push_str(&pattern[last..g.start]);
                let value = params
                    .iter()
                    .find(|(k, _)| *k == g.name)
                    .map(|(_, v)| *v)
                    .unwrap_or_default();
                out.push_str(value);
                last = g.end;
            }
            out.push_str(&pattern[last..]);

            let Some(literal) = unescape_literal(out.trim_start_matches('^').trim_end_matches('$')) else {
                continue;
            };
            return Ok(match self.prefix(pattern, base)? {
                Some(prefix) => format!("{}{}", prefix, literal),
                None => literal,
            });
        }
        Err(Error::UrlNotResolvable(format!(
            "no pattern of {:?} takes exactly {:?}",
            self.patterns, wanted
        )))
    }
}

struct Group {
    name: String,
    start: usize,
    end: usize,
}

/// Spans of `(?P<name>...)` / `(?<name>...)` groups, outermost only.
fn named_groups(pattern: &str) -> Vec<Group> {
    let bytes = pattern.as_bytes();
    let mut groups = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        let rest = &bytes[i..];
        let header = if rest.starts_with(b"(?P<") {
            Some(4)
        } else if rest.starts_with(b"(?<") && !rest.starts_with(b"(?<=") && !rest.starts_with(b"(?<!") {
            Some(3)
        } else {
            None
        };
        if let Some(skip) = header {
            let name_start = i + skip;
            let Some(name_len) = pattern[name_start..].find('>') else {
                break;
            };
            let name = pattern[name_start..name_start + name_len].to_string();
            let mut depth = 0usize;
            let mut j = i;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 1,
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            let end = (j + 1).min(bytes.len());
            groups.push(Group { name, start: i, end });
            i = end;
            continue;
        }
        i += 1;
    }
    groups
}

/// Turn a regex made only of literals into the literal string.
fn unescape_literal(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '*' | '+' | '[' | ']' | '(' | ')' | '|' | '{' | '}' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}
