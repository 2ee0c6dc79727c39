// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::extract::Listing;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Hard cap on followed pages.
pub const MAX_PAGES: usize = 100;

/// Lazily follows "next page" links.
///
/// `fetch` loads one URL and parses it into a [`Listing`]. The records of a
/// page are yielded before the next page is requested. The chain ends on a
/// page without a next link, on a link already visited, or after
/// `max_pages` pages (reported once as [`Error::TooManyPages`]). The first
/// error is yielded and ends the iteration.
pub struct Pagination<T, F> {
    fetch: F,
    next: Option<String>,
    visited: HashSet<String>,
    buffer: VecDeque<T>,
    pages: usize,
    max_pages: usize,
    done: bool,
}

impl<T, F> Pagination<T, F>
where
    F: FnMut(&str) -> Result<Listing<T>>,
{
    pub fn new(start: &str, fetch: F) -> Self {
        Self {
            fetch,
            next: Some(start.to_string()),
            visited: HashSet::new(),
            buffer: VecDeque::new(),
            pages: 0,
            max_pages: MAX_PAGES,
            done: false,
        }
    }

    pub fn max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    fn load_next(&mut self) -> Option<Result<()>> {
        let url = self.next.take()?;
        if !self.visited.insert(url.clone()) {
            debug!(url = %url, "next page already visited");
            return None;
        }
        if self.pages >= self.max_pages {
            warn!(pages = self.pages, "too many pages");
            return Some(Err(Error::TooManyPages(self.pages)));
        }
        self.pages += 1;
        match (self.fetch)(&url) {
            Ok(listing) => {
                debug!(url = %url, items = listing.items.len(), page = self.pages, "page loaded");
                self.buffer.extend(listing.items);
                self.next = listing.next;
                Some(Ok(()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<T, F> Iterator for Pagination<T, F>
where
    F: FnMut(&str) -> Result<Listing<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match self.load_next() {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
