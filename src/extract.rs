// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Declarative extraction of records from HTML and JSON documents.
//!
//! A [`Field`] is a pipeline: select a node, clean its text, run text
//! filters, parse into the target type. A missing node or a failed parse
//! yields the configured default, or a named error when there is none.
//! An [`ItemSpec`] is an ordered table of named fields applied to one node;
//! a [`ListSpec`] finds the item nodes of a page and the next-page link.

use crate::browser::Page;
use crate::error::{Error, Result};
use crate::mapper::VocabMap;
use crate::utils::{clean_decimal, clean_text, DecimalStyle};
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The document fragment a field reads from.
#[derive(Clone, Copy)]
pub enum Node<'a> {
    Html(ElementRef<'a>),
    Json(&'a Value),
}

#[derive(Clone, Copy)]
pub struct Ctx<'a> {
    pub node: Node<'a>,
    pub columns: Option<&'a TableColumns>,
}

impl<'a> Ctx<'a> {
    pub fn html(el: ElementRef<'a>) -> Self {
        Self {
            node: Node::Html(el),
            columns: None,
        }
    }

    pub fn json(value: &'a Value) -> Self {
        Self {
            node: Node::Json(value),
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: &'a TableColumns) -> Self {
        self.columns = Some(columns);
        self
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Data(format!("bad selector '{}': {:?}", css, e)))
}

fn json_scalar(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Follow a slash-separated path of keys and array indices.
pub fn json_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for key in path.split('/').filter(|k| !k.is_empty()) {
        cur = match cur {
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(key)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Like [`json_path`], with `*` expanding every element of an array or
/// object. The final arrays/objects are flattened into their elements.
pub fn json_select_all<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut bases = vec![root];
    for key in path.split('/').filter(|k| !k.is_empty()) {
        let mut next = Vec::new();
        for base in bases {
            match (key, base) {
                ("*", Value::Array(items)) => next.extend(items.iter()),
                ("*", Value::Object(map)) => next.extend(map.values()),
                (_, Value::Array(items)) => next.extend(key.parse::<usize>().ok().and_then(|i| items.get(i))),
                (_, Value::Object(map)) => next.extend(map.get(key)),
                _ => {}
            }
        }
        bases = next;
    }
    bases
        .into_iter()
        .flat_map(|b| -> Vec<&Value> {
            match b {
                Value::Array(items) => items.iter().collect(),
                Value::Object(map) => map.values().collect(),
                Value::Null => Vec::new(),
                other => vec![other],
            }
        })
        .collect()
}

/// Where a field's raw text comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// All text under the node.
    Text,
    /// Text nodes directly under the node.
    OwnText,
    /// Text of the first descendant matching a CSS selector.
    Css(String),
    /// Attribute of the first descendant matching a selector; an empty
    /// selector reads the node itself.
    Attr(String, String),
    /// Slash-separated JSON path.
    Json(String),
    /// Cell of the current row under a named table column.
    Cell(String),
    Const(String),
}

impl Source {
    pub fn css(sel: &str) -> Self {
        Source::Css(sel.to_string())
    }

    pub fn attr(sel: &str, attr: &str) -> Self {
        Source::Attr(sel.to_string(), attr.to_string())
    }

    pub fn json(path: &str) -> Self {
        Source::Json(path.to_string())
    }

    pub fn cell(column: &str) -> Self {
        Source::Cell(column.to_string())
    }

    /// Raw text, or `None` when nothing matches.
    pub fn read(&self, ctx: &Ctx<'_>) -> Result<Option<String>> {
        match (self, ctx.node) {
            (Source::Const(v), _) => Ok(Some(v.clone())),
            (Source::Text, Node::Html(el)) => Ok(Some(el.text().collect())),
            (Source::Text, Node::Json(v)) => Ok(json_scalar(v)),
            (Source::OwnText, Node::Html(el)) => Ok(Some(
                el.children()
                    .filter_map(|c| c.value().as_text().map(|t| String::from(&**t)))
                    .collect(),
            )),
            (Source::Css(css), Node::Html(el)) => {
                let sel = selector(css)?;
                Ok(el.select(&sel).next().map(|n| n.text().collect()))
            }
            (Source::Attr(css, attr), Node::Html(el)) => {
                let target = if css.is_empty() {
                    Some(el)
                } else {
                    el.select(&selector(css)?).next()
                };
                Ok(target.and_then(|n| n.value().attr(attr)).map(str::to_string))
            }
            (Source::Json(path), Node::Json(v)) => Ok(json_path(v, path).and_then(json_scalar)),
            (Source::Cell(column), Node::Html(row)) => {
                let Some(idx) = ctx.columns.and_then(|c| c.index(column)) else {
                    return Ok(None);
                };
                Ok(row_cells(row).into_iter().nth(idx).map(|c| c.text().collect()))
            }
            _ => Ok(None),
        }
    }
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

/// Text transformation applied after cleaning, before parsing.
#[derive(Debug, Clone)]
pub enum TextFilter {
    /// Keep the expansion of `template` (`$1`, `${name}`) for the first
    /// match; without a template, the first group or the whole match.
    Regex {
        pattern: String,
        template: Option<String>,
        compiled: OnceCell<Regex>,
    },
    Replace(String, String),
    Lower,
    Upper,
    /// Trim these characters from both ends.
    Strip(String),
}

impl TextFilter {
    pub fn regex(pattern: &str, template: Option<&str>) -> Self {
        TextFilter::Regex {
            pattern: pattern.to_string(),
            template: template.map(str::to_string),
            compiled: OnceCell::new(),
        }
    }

    fn apply(&self, field: &str, text: String) -> Result<String> {
        match self {
            TextFilter::Regex {
                pattern,
                template,
                compiled,
            } => {
                let re = compiled.get_or_try_init(|| {
                    Regex::new(pattern).map_err(|e| Error::field_parse(field, pattern, e))
                })?;
                let caps = re
                    .captures(&text)
                    .ok_or_else(|| Error::field_parse(field, &text, format!("no match for /{}/", pattern)))?;
                let out = match template {
                    Some(t) => {
                        let mut dst = String::new();
                        caps.expand(t, &mut dst);
                        dst
                    }
                    None => caps
                        .get(1)
                        .or_else(|| caps.get(0))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                };
                Ok(out)
            }
            TextFilter::Replace(from, to) => Ok(text.replace(from.as_str(), to)),
            TextFilter::Lower => Ok(text.to_lowercase()),
            TextFilter::Upper => Ok(text.to_uppercase()),
            TextFilter::Strip(chars) => Ok(text.trim_matches(|c| chars.contains(c)).to_string()),
        }
    }
}

type Parser<T> = Arc<dyn Fn(&str) -> std::result::Result<T, String> + Send + Sync>;

/// One extraction pipeline producing a `T`.
#[derive(Clone)]
pub struct Field<T> {
    name: String,
    source: Source,
    filters: Vec<TextFilter>,
    parser: Parser<T>,
    default: Option<T>,
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("filters", &self.filters)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Field<T> {
    pub fn new(
        name: &str,
        source: Source,
        parser: impl Fn(&str) -> std::result::Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            source,
            filters: Vec::new(),
            parser: Arc::new(parser),
            default: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(mut self, filter: TextFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn regex(self, pattern: &str, template: Option<&str>) -> Self {
        self.filter(TextFilter::regex(pattern, template))
    }

    pub fn replace(self, from: &str, to: &str) -> Self {
        self.filter(TextFilter::Replace(from.to_string(), to.to_string()))
    }

    pub fn default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Missing or unparsable values become `None`.
    pub fn optional(self) -> Field<Option<T>> {
        let parser = self.parser;
        Field {
            name: self.name,
            source: self.source,
            filters: self.filters,
            parser: Arc::new(move |s: &str| parser(s).map(Some)),
            default: Some(None),
        }
    }

    fn run(&self, ctx: &Ctx<'_>) -> Result<T> {
        let raw = self.source.read(ctx)?.ok_or_else(|| Error::FieldNotFound {
            field: self.name.clone(),
        })?;
        let mut text = clean_text(&raw);
        for f in &self.filters {
            text = f.apply(&self.name, text)?;
        }
        (self.parser)(&text).map_err(|reason| Error::field_parse(&self.name, &text, reason))
    }

    pub fn extract(&self, ctx: &Ctx<'_>) -> Result<T> {
        match self.run(ctx) {
            Ok(v) => Ok(v),
            Err(e @ (Error::FieldNotFound { .. } | Error::FieldParse { .. })) => match &self.default {
                Some(d) => {
                    debug!(field = %self.name, error = %e, "using default");
                    Ok(d.clone())
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

impl Field<String> {
    pub fn text(name: &str, source: Source) -> Self {
        Field::new(name, source, |s| Ok(s.to_string()))
    }

    /// Like [`Field::text`] but an empty result counts as missing.
    pub fn non_empty(name: &str, source: Source) -> Self {
        Field::new(name, source, |s| {
            if s.is_empty() {
                Err("empty".to_string())
            } else {
                Ok(s.to_string())
            }
        })
    }
}

impl Field<Decimal> {
    pub fn decimal(name: &str, source: Source, style: DecimalStyle) -> Self {
        Field::new(name, source, move |s| clean_decimal(s, style).map_err(|e| e.to_string()))
    }
}

impl Field<NaiveDate> {
    pub fn date(name: &str, source: Source, fmt: &'static str) -> Self {
        Field::new(name, source, move |s| {
            NaiveDate::parse_from_str(s, fmt).map_err(|e| e.to_string())
        })
    }

    pub fn date_dmy(name: &str, source: Source) -> Self {
        Field::new(name, source, |s| crate::dates::parse_dmy(s).map_err(|e| e.to_string()))
    }
}

impl<K: Copy + fmt::Debug + Send + Sync + 'static> Field<K> {
    /// Look the text up in a vocabulary; unknown words take the map's fallback.
    pub fn map(name: &str, source: Source, vocab: Arc<VocabMap<K>>) -> Self {
        Field::new(name, source, move |s| Ok(vocab.get(s)))
    }
}

/// What an item step tells the item parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Drop the current item silently.
    Skip,
}

type Step<T> = Box<dyn Fn(&Ctx<'_>, &mut T) -> Result<Flow> + Send + Sync>;

struct NamedStep<T> {
    name: String,
    mandatory: bool,
    run: Step<T>,
}

/// Ordered table of named extraction steps building one `T`.
pub struct ItemSpec<T> {
    steps: Vec<NamedStep<T>>,
    condition: Option<Box<dyn Fn(&Ctx<'_>) -> bool + Send + Sync>>,
    validate: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
    skip_optional_errors: bool,
}

impl<T: Default> Default for ItemSpec<T> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            condition: None,
            validate: None,
            skip_optional_errors: false,
        }
    }
}

impl<T: Default + 'static> ItemSpec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_field<V>(mut self, field: Field<V>, set: fn(&mut T, V), mandatory: bool) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        let name = field.name().to_string();
        self.steps.push(NamedStep {
            name,
            mandatory,
            run: Box::new(move |ctx, obj| {
                set(obj, field.extract(ctx)?);
                Ok(Flow::Continue)
            }),
        });
        self
    }

    /// A field whose failure aborts the item.
    pub fn field<V>(self, field: Field<V>, set: fn(&mut T, V)) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        self.push_field(field, set, true)
    }

    /// A field whose failure is only logged once `skip_optional_errors` is on.
    pub fn optional_field<V>(self, field: Field<V>, set: fn(&mut T, V)) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        self.push_field(field, set, false)
    }

    /// A computed step, run in declaration order after the fields before it.
    pub fn with(
        mut self,
        name: &str,
        step: impl Fn(&Ctx<'_>, &mut T) -> Result<Flow> + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(NamedStep {
            name: name.to_string(),
            mandatory: true,
            run: Box::new(step),
        });
        self
    }

    pub fn condition(mut self, cond: impl Fn(&Ctx<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Box::new(cond));
        self
    }

    pub fn validate(mut self, check: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Some(Box::new(check));
        self
    }

    pub fn skip_optional_errors(mut self, skip: bool) -> Self {
        self.skip_optional_errors = skip;
        self
    }

    /// `Ok(None)` when the condition, a step or the validator drops the item.
    pub fn parse(&self, ctx: &Ctx<'_>) -> Result<Option<T>> {
        if let Some(cond) = &self.condition {
            if !cond(ctx) {
                return Ok(None);
            }
        }
        let mut obj = T::default();
        for step in &self.steps {
            match (step.run)(ctx, &mut obj) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Skip) => {
                    debug!(step = %step.name, "item skipped");
                    return Ok(None);
                }
                Err(e) if !step.mandatory && self.skip_optional_errors => {
                    warn!(field = %step.name, error = %e, "ignoring optional field");
                }
                Err(e) => {
                    warn!(field = %step.name, error = %e, "field failed");
                    return Err(e);
                }
            }
        }
        if let Some(check) = &self.validate {
            if !check(&obj) {
                return Ok(None);
            }
        }
        Ok(Some(obj))
    }

    /// Parse a whole HTML document as a single item.
    pub fn parse_html(&self, doc: &Html) -> Result<Option<T>> {
        self.parse(&Ctx::html(doc.root_element()))
    }

    pub fn parse_json(&self, doc: &Value) -> Result<Option<T>> {
        self.parse(&Ctx::json(doc))
    }
}

#[derive(Debug, Clone)]
enum TitleMatch {
    Exact(String),
    Pattern(Regex),
}

/// A table column known by one or more header titles.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    titles: Vec<TitleMatch>,
}

impl Column {
    /// Matches any of `titles`, case-insensitively.
    pub fn new(name: &str, titles: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            titles: titles.iter().map(|t| TitleMatch::Exact(t.to_lowercase())).collect(),
        }
    }

    /// Adds a case-insensitive regex title.
    pub fn or_matching(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(&format!("(?i){}", pattern))
            .map_err(|e| Error::Data(format!("bad column pattern '{}': {}", pattern, e)))?;
        self.titles.push(TitleMatch::Pattern(re));
        Ok(self)
    }

    fn accepts(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.titles.iter().any(|t| match t {
            TitleMatch::Exact(s) => *s == lower,
            TitleMatch::Pattern(re) => re.is_match(title),
        })
    }
}

/// Column indices resolved from a header row, `colspan` included.
#[derive(Debug, Clone, Default)]
pub struct TableColumns {
    indices: BTreeMap<String, usize>,
}

impl TableColumns {
    pub fn resolve(root: ElementRef<'_>, head_selector: &str, columns: &[Column]) -> Result<Self> {
        let sel = selector(head_selector)?;
        let mut indices = BTreeMap::new();
        let mut colnum = 0usize;
        for th in root.select(&sel) {
            let title = clean_text(&th.text().collect::<String>());
            for col in columns {
                if !indices.contains_key(&col.name) && col.accepts(&title) {
                    indices.insert(col.name.clone(), colnum);
                }
            }
            colnum += th
                .value()
                .attr("colspan")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1);
        }
        Ok(Self { indices })
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }
}

#[derive(Debug, Clone)]
pub enum ItemSelector {
    Css(String),
    Json(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Raw next-page link, possibly relative.
    pub next: Option<String>,
}

struct TableHead {
    selector: String,
    columns: Vec<Column>,
}

/// Locates item nodes on a page and parses each with an [`ItemSpec`].
pub struct ListSpec<T> {
    items: ItemSelector,
    item: ItemSpec<T>,
    empty: Option<String>,
    next_page: Option<Field<String>>,
    head: Option<TableHead>,
    id_of: Option<fn(&T) -> String>,
    ignore_duplicate: bool,
}

impl<T: Default + 'static> ListSpec<T> {
    pub fn css(selector: &str, item: ItemSpec<T>) -> Self {
        Self::with_selector(ItemSelector::Css(selector.to_string()), item)
    }

    pub fn json(path: &str, item: ItemSpec<T>) -> Self {
        Self::with_selector(ItemSelector::Json(path.to_string()), item)
    }

    fn with_selector(items: ItemSelector, item: ItemSpec<T>) -> Self {
        Self {
            items,
            item,
            empty: None,
            next_page: None,
            head: None,
            id_of: None,
            ignore_duplicate: false,
        }
    }

    /// Selector present on pages that are legitimately empty. When set, a
    /// page with no item and no such marker logs a warning.
    pub fn empty_selector(mut self, css: &str) -> Self {
        self.empty = Some(css.to_string());
        self
    }

    /// Evaluated against the document root.
    pub fn next_page(mut self, field: Field<String>) -> Self {
        self.next_page = Some(field);
        self
    }

    /// Resolve `Source::Cell` columns from header cells.
    pub fn table(mut self, head_selector: &str, columns: Vec<Column>) -> Self {
        self.head = Some(TableHead {
            selector: head_selector.to_string(),
            columns,
        });
        self
    }

    /// Reject two items with the same id on one page.
    pub fn unique_by(mut self, id_of: fn(&T) -> String) -> Self {
        self.id_of = Some(id_of);
        self
    }

    /// Drop duplicates with a warning instead of failing.
    pub fn ignore_duplicate(mut self) -> Self {
        self.ignore_duplicate = true;
        self
    }

    fn store(&self, seen: &mut HashSet<String>, items: &mut Vec<T>, obj: T) -> Result<()> {
        if let Some(id_of) = self.id_of {
            let id = id_of(&obj);
            if !id.is_empty() && !seen.insert(id.clone()) {
                if self.ignore_duplicate {
                    warn!(id = %id, "two objects with the same id");
                    return Ok(());
                }
                return Err(Error::Data(format!("two objects with the same id: {}", id)));
            }
        }
        items.push(obj);
        Ok(())
    }

    fn next_link(&self, ctx: &Ctx<'_>) -> Result<Option<String>> {
        let Some(field) = &self.next_page else {
            return Ok(None);
        };
        match field.extract(ctx) {
            Ok(url) if url.is_empty() => Ok(None),
            Ok(url) => Ok(Some(url)),
            Err(Error::FieldNotFound { .. } | Error::FieldParse { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn parse_html(&self, doc: &Html) -> Result<Listing<T>> {
        let root = doc.root_element();
        let columns = match &self.head {
            Some(head) => TableColumns::resolve(root, &head.selector, &head.columns)?,
            None => TableColumns::default(),
        };
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        match &self.items {
            ItemSelector::Css(css) => {
                let sel = selector(css)?;
                let mut found = 0usize;
                for el in root.select(&sel) {
                    found += 1;
                    let ctx = Ctx::html(el).with_columns(&columns);
                    if let Some(obj) = self.item.parse(&ctx)? {
                        self.store(&mut seen, &mut items, obj)?;
                    }
                }
                if found == 0 {
                    let empty_ok = match &self.empty {
                        Some(css) => root.select(&selector(css)?).next().is_some(),
                        None => false,
                    };
                    if !empty_ok && self.empty.is_some() {
                        warn!(selector = %css, "no item matched and the empty marker is missing");
                    }
                }
            }
            ItemSelector::Json(_) => {
                return Err(Error::Data("JSON item selector used on an HTML page".to_string()));
            }
        }
        let next = self.next_link(&Ctx::html(root))?;
        Ok(Listing { items, next })
    }

    pub fn parse_json(&self, doc: &Value) -> Result<Listing<T>> {
        let ItemSelector::Json(path) = &self.items else {
            return Err(Error::Data("CSS item selector used on a JSON page".to_string()));
        };
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for v in json_select_all(doc, path) {
            if let Some(obj) = self.item.parse(&Ctx::json(v))? {
                self.store(&mut seen, &mut items, obj)?;
            }
        }
        let next = self.next_link(&Ctx::json(doc))?;
        Ok(Listing { items, next })
    }

    pub fn parse<K>(&self, page: &Page<K>) -> Result<Listing<T>> {
        match self.items {
            ItemSelector::Css(_) => self.parse_html(&page.html()),
            ItemSelector::Json(_) => self.parse_json(&page.json()?),
        }
    }
}
