// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Errors surfaced by browsers, page parsers and module facades.
#[derive(Debug, Error)]
pub enum Error {
    #[error("incorrect credentials: {0}")]
    IncorrectPassword(String),

    #[error("action needed on the website: {0}")]
    ActionNeeded(String),

    #[error("website unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("no page matches {0}")]
    UnexpectedPage(String),

    #[error("HTTP {status} on {url}")]
    HttpStatus { status: u16, url: String },

    #[error("cannot build URL: {0}")]
    UrlNotResolvable(String),

    #[error("field '{field}' not found")]
    FieldNotFound { field: String },

    #[error("field '{field}': cannot parse '{value}': {reason}")]
    FieldParse {
        field: String,
        value: String,
        reason: String,
    },

    #[error("incoherent data: {0}")]
    Data(String),

    #[error("pagination stopped after {0} pages")]
    TooManyPages(usize),

    #[error("transfer refused: {0}")]
    TransferInvalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend configuration: {0}")]
    Config(String),

    #[error("session state: {0}")]
    State(String),

    #[error("switching to site {0}")]
    SiteSwitch(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn field_parse(field: &str, value: &str, reason: impl ToString) -> Self {
        Error::FieldParse {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Transport failures and server-side statuses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
