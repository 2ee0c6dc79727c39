// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use sitekit::error::{Error, Result};
use sitekit::extract::Listing;
use sitekit::paginate::{Pagination, MAX_PAGES};
use std::collections::HashMap;

fn listing(items: &[u32], next: Option<&str>) -> Listing<u32> {
    Listing {
        items: items.to_vec(),
        next: next.map(str::to_string),
    }
}

fn site(pages: Vec<(&str, Listing<u32>)>) -> HashMap<String, Listing<u32>> {
    pages.into_iter().map(|(url, l)| (url.to_string(), l)).collect()
}

#[test]
fn finite_chain_yields_every_item_once() {
    let pages = site(vec![
        ("p1", listing(&[1, 2], Some("p2"))),
        ("p2", listing(&[3], Some("p3"))),
        ("p3", listing(&[4, 5], None)),
    ]);
    let mut fetched = Vec::new();
    let items: Vec<u32> = Pagination::new("p1", |url: &str| {
        fetched.push(url.to_string());
        Ok(pages[url].clone())
    })
    .collect::<Result<_>>()
    .unwrap();
    assert_eq!(items, [1, 2, 3, 4, 5]);
    assert_eq!(fetched, ["p1", "p2", "p3"]);
}

#[test]
fn items_come_before_the_next_fetch() {
    let pages = site(vec![("p1", listing(&[1], Some("p2"))), ("p2", listing(&[2], None))]);
    let mut calls = 0;
    let mut pager = Pagination::new("p1", |url: &str| {
        calls += 1;
        Ok(pages[url].clone())
    });
    assert_eq!(pager.next().unwrap().unwrap(), 1);
    assert_eq!(pager.pages(), 1);
    assert_eq!(pager.next().unwrap().unwrap(), 2);
    assert_eq!(pager.pages(), 2);
    assert!(pager.next().is_none());
    drop(pager);
    assert_eq!(calls, 2);
}

#[test]
fn loops_stop_at_an_already_visited_page() {
    let pages = site(vec![("p1", listing(&[1], Some("p2"))), ("p2", listing(&[2], Some("p1")))]);
    let items: Vec<u32> = Pagination::new("p1", |url: &str| Ok(pages[url].clone()))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(items, [1, 2]);
}

#[test]
fn endless_chain_reports_too_many_pages_once() {
    let mut pager = Pagination::new("0", |url: &str| {
        let n: usize = url.parse().unwrap();
        Ok(Listing {
            items: vec![n],
            next: Some((n + 1).to_string()),
        })
    })
    .max_pages(3);
    let results: Vec<Result<usize>> = pager.by_ref().collect();
    assert_eq!(results.len(), 4);
    assert!(matches!(results[3], Err(Error::TooManyPages(3))));
    assert!(pager.next().is_none());
    assert!(MAX_PAGES >= 3);
}

#[test]
fn fetch_error_is_yielded_and_ends_iteration() {
    let pages = site(vec![("p1", listing(&[1], Some("p2")))]);
    let mut pager = Pagination::new("p1", |url: &str| match pages.get(url) {
        Some(l) => Ok(l.clone()),
        None => Err(Error::UnexpectedPage(url.to_string())),
    });
    assert_eq!(pager.next().unwrap().unwrap(), 1);
    assert!(matches!(pager.next(), Some(Err(Error::UnexpectedPage(_)))));
    assert!(pager.next().is_none());
}
