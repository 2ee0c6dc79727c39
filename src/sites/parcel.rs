// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Parcel tracking over two carrier sites: the express JSON API and the
//! postal HTML search. Tracking numbers decide which one answers.

use super::BackendConfig;
use crate::browser::state::Stateful;
use crate::browser::switch::SwitchingBrowser;
use crate::browser::{Browser, BrowserConfig, Page, Router, SessionState, UrlPattern};
use crate::capabilities::{CapParcel, Module};
use crate::error::{Error, Result};
use crate::extract::{json_path, Ctx, Field, ItemSpec, ListSpec, Source};
use crate::mapper::VocabMap;
use crate::models::{Parcel, ParcelEvent, ParcelStatus};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

pub const NAME: &str = "parcel";

const EXPRESS: &str = "main";
const POST: &str = "post";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    ExpressSearch,
    PostSearch,
}

/// Postal tracking numbers start with `JJ` or have 20 characters.
pub fn is_post_id(id: &str) -> bool {
    id.starts_with("JJ") || id.len() == 20
}

fn express_statuses() -> VocabMap<ParcelStatus> {
    VocabMap::new(
        &[
            ("105", ParcelStatus::Planned),
            ("104", ParcelStatus::Planned),
            ("102", ParcelStatus::InTransit),
            ("101", ParcelStatus::Arrived),
        ],
        ParcelStatus::Unknown,
    )
}

fn post_statuses() -> VocabMap<ParcelStatus> {
    VocabMap::new(
        &[
            ("parcel center.", ParcelStatus::InTransit),
            ("export parcel center.", ParcelStatus::InTransit),
            ("parcel center of origin.", ParcelStatus::InTransit),
            ("delivery successful.", ParcelStatus::Arrived),
        ],
        ParcelStatus::Unknown,
    )
}

/// Day-first timestamp, time optional.
fn parse_stamp(s: &str) -> std::result::Result<NaiveDateTime, String> {
    let s = s.replace('.', "/");
    for fmt in ["%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
        .map_err(|e| e.to_string())?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| "no such time".to_string())
}

fn express_events() -> ListSpec<ParcelEvent> {
    let item = ItemSpec::<ParcelEvent>::new()
        .with("date", |ctx, e| {
            let date = Field::text("date", Source::json("date")).extract(ctx)?;
            let time = Field::text("time", Source::json("time"))
                .default(String::new())
                .extract(ctx)?;
            e.date = parse_stamp(&format!("{} {}", date, time)).ok();
            Ok(crate::extract::Flow::Continue)
        })
        .field(Field::text("location", Source::json("location")).default(String::new()), |e, v| {
            e.location = v
        })
        .field(Field::non_empty("activity", Source::json("description")), |e, v| {
            e.activity = v
        });
    ListSpec::json("results/0/checkpoints", item)
}

fn post_events() -> ListSpec<ParcelEvent> {
    let item = ItemSpec::<ParcelEvent>::new()
        .field(
            Field::new("date", Source::css("td.date"), parse_stamp).optional(),
            |e, v| e.date = v,
        )
        .field(Field::text("location", Source::css("td.location")).default(String::new()), |e, v| {
            e.location = v
        })
        .field(Field::non_empty("activity", Source::css("td.activity")), |e, v| {
            e.activity = v
        });
    ListSpec::css("table#events tbody tr", item)
}

fn parse_express(page: &Page<Kind>, id: &str) -> Result<Parcel> {
    let doc = page.json()?;
    if doc.get("errors").is_some() {
        return Err(Error::NotFound(format!("parcel {}", id)));
    }
    let result = json_path(&doc, "results/0")
        .ok_or_else(|| Error::NotFound(format!("unexpected reply for parcel {}", id)))?;
    let status = Field::map("status", Source::json("delivery/code"), Arc::new(express_statuses()))
        .default(ParcelStatus::Unknown)
        .extract(&Ctx::json(result))?;
    let history = express_events().parse_json(&doc)?.items;
    let info = history.first().map(|e| e.activity.clone()).unwrap_or_default();
    Ok(Parcel {
        id: id.to_string(),
        status,
        info,
        history,
    })
}

fn parse_post(page: &Page<Kind>, id: &str) -> Result<Parcel> {
    let html = page.html();
    let root = Ctx::html(html.root_element());
    let number = Field::text("number", Source::css("dd.shipment-number"))
        .regex(r"(\S+)$", None)
        .extract(&root)
        .map_err(|_| Error::NotFound(format!("parcel {}", id)))?;
    if number != id {
        return Err(Error::NotFound(format!("expected parcel {}, got {}", id, number)));
    }
    let status = Field::map("status", Source::css("div.status dd"), Arc::new(post_statuses()))
        .regex(r"^[^:]*:\s*(.*)$", None)
        .default(ParcelStatus::Unknown)
        .extract(&root)?;
    let mut history = post_events().parse_html(&html)?.items;
    history.reverse();
    let info = history.first().map(|e| e.activity.clone()).unwrap_or_default();
    Ok(Parcel {
        id: id.to_string(),
        status,
        info,
        history,
    })
}

/// One carrier site; asks for a switch when the id belongs to the other.
pub struct CarrierBrowser {
    inner: Browser<Kind>,
    site: &'static str,
}

impl CarrierBrowser {
    fn new(site: &'static str, config: BrowserConfig) -> Result<Self> {
        let router = Router::new()
            .route(Kind::ExpressSearch, UrlPattern::one(r"shipmentTracking\?AWB=(?P<id>\w+)"))
            .route(Kind::PostSearch, UrlPattern::one(r"sendung/(?P<id>\w+)"));
        Ok(Self {
            inner: Browser::new(config, router)?,
            site,
        })
    }

    pub fn site(&self) -> &str {
        self.site
    }

    pub fn track(&mut self, id: &str) -> Result<Parcel> {
        let wanted = if is_post_id(id) { POST } else { EXPRESS };
        if wanted != self.site {
            return Err(Error::SiteSwitch(wanted.to_string()));
        }
        match self.site {
            POST => {
                let page = self.inner.go(Kind::PostSearch, &[("id", id)])?;
                parse_post(&page, id)
            }
            _ => {
                let page = self.inner.go(Kind::ExpressSearch, &[("id", id)])?;
                parse_express(&page, id)
            }
        }
    }
}

impl Stateful for CarrierBrowser {
    fn dump_state(&self) -> SessionState {
        self.inner.dump_state()
    }

    fn load_state(&mut self, state: SessionState) -> Result<bool> {
        self.inner.load_state(state)
    }
}

pub struct ParcelTracker {
    name: String,
    browsers: SwitchingBrowser<CarrierBrowser>,
}

impl ParcelTracker {
    /// Parameters: `url` (express API) and `post_url` (postal site).
    pub fn new(backend: &BackendConfig) -> Result<Self> {
        let express = backend.browser_config("https://www.dhl.com/")?;
        let post = BackendConfig {
            params: backend
                .params
                .iter()
                .filter(|(k, _)| k.as_str() != "url")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            ..backend.clone()
        }
        .browser_config(backend.param("post_url").unwrap_or("https://nolp.dhl.de/nextt-online-public/"))?;
        let browsers = SwitchingBrowser::new(move || CarrierBrowser::new(EXPRESS, express.clone()))?
            .with_browser(POST, move || CarrierBrowser::new(POST, post.clone()));
        Ok(Self {
            name: backend.name.clone(),
            browsers,
        })
    }

    /// Name of the carrier site in use.
    pub fn site(&self) -> &str {
        self.browsers.name()
    }
}

impl CapParcel for ParcelTracker {
    fn get_parcel_tracking(&mut self, id: &str) -> Result<Parcel> {
        let id = id.trim();
        self.browsers.call(|b| b.track(id))
    }
}

impl Module for ParcelTracker {
    fn name(&self) -> &str {
        &self.name
    }

    fn dump_state(&self) -> SessionState {
        self.browsers.dump_state()
    }

    fn load_state(&mut self, state: SessionState) -> Result<bool> {
        self.browsers.load_state(state)
    }

    fn as_parcel(&mut self) -> Option<&mut dyn CapParcel> {
        Some(self)
    }
}
