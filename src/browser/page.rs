// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::url::Params;
use crate::error::Result;
use scraper::Html;
use serde_json::Value;
use std::borrow::Cow;

/// A fetched response bound to the page kind its URL resolved to.
#[derive(Debug, Clone)]
pub struct Page<K> {
    pub kind: K,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Named groups captured by the matching URL pattern.
    pub params: Params,
    body: Vec<u8>,
}

/// Parsed body of a page.
pub enum PageDoc {
    Html(Html),
    Json(Value),
    Csv(Vec<Vec<String>>),
    Raw(Vec<u8>),
}

impl<K> Page<K> {
    pub fn new(kind: K, url: &str, status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            kind,
            url: url.to_string(),
            status,
            content_type,
            params: Params::new(),
            body,
        }
    }

    /// A 200 page from an in-memory body, handy for parser tests.
    pub fn from_body(kind: K, url: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(kind, url, 200, None, body.into())
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn html(&self) -> Html {
        Html::parse_document(&self.text())
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Rows of a CSV body, header row included.
    pub fn csv(&self, delimiter: u8) -> Result<Vec<Vec<String>>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(self.body.as_slice());
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|s| s.trim().to_string()).collect());
        }
        Ok(rows)
    }

    /// Parse the body according to its declared content type.
    pub fn doc(&self) -> Result<PageDoc> {
        let ct = self.content_type.as_deref().unwrap_or("").to_ascii_lowercase();
        if ct.contains("json") {
            Ok(PageDoc::Json(self.json()?))
        } else if ct.contains("csv") {
            Ok(PageDoc::Csv(self.csv(b',')?))
        } else if ct.contains("html") || ct.contains("xml") || ct.is_empty() {
            Ok(PageDoc::Html(self.html()))
        } else {
            Ok(PageDoc::Raw(self.body.clone()))
        }
    }
}
