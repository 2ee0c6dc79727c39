// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! HTTP session plus URL-to-page dispatch.
//!
//! A module declares a closed enum of page kinds and an ordered [`Router`]
//! mapping URL patterns to those kinds. Every navigation goes through
//! [`Browser::location`], which performs the request, resolves the final URL
//! to a kind and keeps the result as the current page.

pub mod page;
pub mod state;
pub mod switch;
pub mod url;

pub use page::{Page, PageDoc};
pub use state::{SessionState, StoredCookie};
pub use url::{Params, UrlPattern};

use crate::error::{Error, Result};
use chrono::{Duration as StateDuration, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const UA: &str = concat!(
    "sitekit/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/sitekit)"
);

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after a transport error or a 5xx.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
    pub verify_tls: bool,
    /// Saved sessions older than this are not restored.
    pub state_duration: Option<StateDuration>,
}

impl BrowserConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            user_agent: UA.to_string(),
            verify_tls: true,
            state_duration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Hand 4xx/5xx pages to the router instead of failing.
    pub allow_errors: bool,
    /// Resend after a transport error or a 5xx. Off for POST.
    pub retry: bool,
}

impl Request {
    fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            query: Vec::new(),
            form: None,
            json: None,
            headers: Vec::new(),
            allow_errors: false,
            retry: method == Method::Get,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, key: &str, value: impl ToString) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn header(mut self, key: &str, value: impl ToString) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn allow_errors(mut self) -> Self {
        self.allow_errors = true;
        self
    }

    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }
}

struct Route<K> {
    kind: K,
    pattern: UrlPattern,
    is_here: Option<fn(&str) -> bool>,
}

/// Ordered URL table; the first route whose pattern (and body check, if
/// any) accepts a response decides its page kind.
pub struct Router<K> {
    routes: Vec<Route<K>>,
    fallback: Option<K>,
}

impl<K> Default for Router<K> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
        }
    }
}

impl<K: Copy + PartialEq + fmt::Debug> Router<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, kind: K, pattern: UrlPattern) -> Self {
        self.routes.push(Route {
            kind,
            pattern,
            is_here: None,
        });
        self
    }

    /// Like [`Router::route`] but also requires `is_here(body)`, for sites
    /// serving several page kinds on one URL.
    pub fn route_if(mut self, kind: K, pattern: UrlPattern, is_here: fn(&str) -> bool) -> Self {
        self.routes.push(Route {
            kind,
            pattern,
            is_here: Some(is_here),
        });
        self
    }

    pub fn fallback(mut self, kind: K) -> Self {
        self.fallback = Some(kind);
        self
    }

    pub fn pattern(&self, kind: K) -> Option<&UrlPattern> {
        self.routes.iter().find(|r| r.kind == kind).map(|r| &r.pattern)
    }

    pub fn resolve(&self, url: &str, base: Option<&str>, body: &str) -> Result<Option<(K, Params)>> {
        for route in &self.routes {
            if let Some(params) = route.pattern.matches(url, base)? {
                if route.is_here.is_none_or(|f| f(body)) {
                    return Ok(Some((route.kind, params)));
                }
            }
        }
        Ok(self.fallback.map(|k| (k, Params::new())))
    }
}

struct Fetched {
    url: String,
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

pub struct Browser<K> {
    config: BrowserConfig,
    client: Client,
    jar: Arc<Jar>,
    router: Router<K>,
    page: Option<Page<K>>,
    state: SessionState,
}

impl<K: Copy + PartialEq + fmt::Debug> Browser<K> {
    pub fn new(config: BrowserConfig, router: Router<K>) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self {
            config,
            client,
            jar,
            router,
            page: None,
            state: SessionState::default(),
        })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Current page, i.e. the result of the last [`Browser::location`].
    pub fn page(&self) -> Option<&Page<K>> {
        self.page.as_ref()
    }

    pub fn is_on(&self, kind: K) -> bool {
        self.page.as_ref().is_some_and(|p| p.kind == kind)
    }

    pub fn absolute_url(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        let base = ::url::Url::parse(&self.config.base_url)?;
        Ok(base.join(url)?.to_string())
    }

    pub fn url_for(&self, kind: K, params: &[(&str, &str)]) -> Result<String> {
        let pattern = self
            .router
            .pattern(kind)
            .ok_or_else(|| Error::UrlNotResolvable(format!("no route for {:?}", kind)))?;
        pattern.build(Some(&self.config.base_url), params)
    }

    /// GET the URL built from `kind`'s pattern.
    pub fn go(&mut self, kind: K, params: &[(&str, &str)]) -> Result<Page<K>> {
        let url = self.url_for(kind, params)?;
        self.location(Request::get(&url))
    }

    /// Perform `req`, dispatch the response and make it the current page.
    pub fn location(&mut self, req: Request) -> Result<Page<K>> {
        let fetched = self.fetch(&req)?;
        let text = String::from_utf8_lossy(&fetched.body);
        let (kind, params) = self
            .router
            .resolve(&fetched.url, Some(&self.config.base_url), &text)?
            .ok_or_else(|| Error::UnexpectedPage(fetched.url.clone()))?;
        debug!(url = %fetched.url, status = fetched.status, kind = ?kind, "page");
        let page = Page::new(kind, &fetched.url, fetched.status, fetched.content_type, fetched.body)
            .with_params(params);
        self.page = Some(page.clone());
        Ok(page)
    }

    /// Perform `req` without touching the current page; the kind is `None`
    /// when no route matches (downloads, redirects to third parties).
    pub fn open(&mut self, req: Request) -> Result<Page<Option<K>>> {
        let fetched = self.fetch(&req)?;
        let text = String::from_utf8_lossy(&fetched.body);
        let resolved = self
            .router
            .resolve(&fetched.url, Some(&self.config.base_url), &text)?;
        let (kind, params) = match resolved {
            Some((k, p)) => (Some(k), p),
            None => (None, Params::new()),
        };
        Ok(Page::new(kind, &fetched.url, fetched.status, fetched.content_type, fetched.body)
            .with_params(params))
    }

    fn fetch(&mut self, req: &Request) -> Result<Fetched> {
        let url = self.absolute_url(&req.url)?;
        let mut attempt = 0;
        loop {
            match self.send(req, &url) {
                Ok(f) => return Ok(f),
                Err(e) if req.retry && e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, "retrying request");
                    std::thread::sleep(self.config.retry_delay * attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn builder(&self, method: Method, req: &Request, url: &str, with_query: bool) -> RequestBuilder {
        let mut builder = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if with_query && !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if method == Method::Post {
            if let Some(form) = &req.form {
                builder = builder.form(form);
            }
            if let Some(json) = &req.json {
                builder = builder.json(json);
            }
        }
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        builder
    }

    /// Send `req` and follow redirects, recording the cookies of every hop.
    fn send(&mut self, req: &Request, url: &str) -> Result<Fetched> {
        let mut method = req.method;
        let mut resp: Response = self.builder(method, req, url, true).send()?;
        let mut hops = 0;
        loop {
            let hop_url = resp.url().clone();
            self.record_cookies(hop_url.as_str(), resp.headers());
            let status = resp.status();
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let Some(location) = location.filter(|_| status.is_redirection()) else {
                break;
            };
            if hops == MAX_REDIRECTS {
                return Err(Error::Data(format!("too many redirects from {}", url)));
            }
            hops += 1;
            let next = hop_url.join(&location)?;
            debug!(from = %hop_url, to = %next, status = status.as_u16(), "redirect");
            // 307 and 308 replay the request, the others turn it into a GET
            if !matches!(status, StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT) {
                method = Method::Get;
            }
            resp = self.builder(method, req, next.as_str(), false).send()?;
        }

        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        debug!(method = ?req.method, url = %final_url, status, "response");
        if status >= 400 && !req.allow_errors {
            return Err(Error::HttpStatus {
                status,
                url: final_url,
            });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes()?.to_vec();
        Ok(Fetched {
            url: final_url,
            status,
            content_type,
            body,
        })
    }

    fn record_cookies(&mut self, url: &str, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(header) = value.to_str() else { continue };
            let cookie = StoredCookie {
                url: url.to_string(),
                header: header.to_string(),
            };
            self.state.cookies.retain(|c| c.name() != cookie.name());
            self.state.cookies.push(cookie);
        }
    }

    pub fn state_get(&self, key: &str) -> Option<&Value> {
        self.state.values.get(key)
    }

    pub fn state_set(&mut self, key: &str, value: impl Into<Value>) {
        self.state.values.insert(key.to_string(), value.into());
    }

    pub fn state_remove(&mut self, key: &str) -> Option<Value> {
        self.state.values.remove(key)
    }

    pub fn dump_state(&self) -> SessionState {
        let mut state = self.state.clone();
        state.saved_at = Utc::now();
        state.url = self.page.as_ref().map(|p| p.url.clone());
        state
    }

    /// Restore cookies and values from a previous session. Returns `false`
    /// when the state is too old or from another layout and was ignored.
    pub fn load_state(&mut self, state: SessionState) -> Result<bool> {
        if state.version != state::STATE_VERSION {
            info!(version = state.version, "ignoring session state from another version");
            return Ok(false);
        }
        if let Some(max_age) = self.config.state_duration {
            if state.is_expired(max_age, Utc::now()) {
                info!(saved_at = %state.saved_at, "ignoring expired session state");
                return Ok(false);
            }
        }
        for cookie in &state.cookies {
            let url = ::url::Url::parse(&cookie.url)?;
            self.jar.add_cookie_str(&cookie.header, &url);
        }
        self.state = state;
        Ok(true)
    }
}

impl<K: Copy + PartialEq + fmt::Debug> state::Stateful for Browser<K> {
    fn dump_state(&self) -> SessionState {
        Browser::dump_state(self)
    }

    fn load_state(&mut self, state: SessionState) -> Result<bool> {
        Browser::load_state(self, state)
    }
}
