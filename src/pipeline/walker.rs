//! Pagination walker
//!
//! Drives the page fetcher across a result-page range, one page at a time.
//! Page order matters: the end-of-results signal is only known after a page
//! has been fetched, so there is no fetch-ahead. Each page gets bounded
//! retries; a page that exhausts them is reported as skipped and the walk
//! carries on, because one bad page must not discard the rest of the run.

use crate::config::{Query, Tuning};
use crate::extract::{extract_listing, TenderSummary};
use crate::portal::PortalFetcher;
use std::time::Duration;

/// What a fetched page says about the rest of the walk
///
/// Explicit tri-state so callers never conflate "no results" with "the fetch
/// failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    /// More result pages follow
    HasMore,
    /// This was the last page (or an empty result set)
    NoMore,
    /// The page was skipped after exhausting retries
    FetchFailed,
}

/// One visited result page
#[derive(Debug, Clone)]
pub struct PageResult {
    /// 1-based page number
    pub page_number: u32,

    /// Tenders found on the page; empty for failed or end-of-results pages
    pub tenders: Vec<TenderSummary>,

    /// Continuation signal
    pub signal: PageSignal,
}

/// Pull-style traversal over a query's result pages
pub struct Walker<'a, F> {
    fetcher: &'a F,
    query: &'a Query,
    tuning: &'a Tuning,
    next_page: u32,
    finished: bool,
    known_total: Option<u32>,
    skipped: Vec<u32>,
}

impl<'a, F: PortalFetcher> Walker<'a, F> {
    /// Creates a walker starting at the query's `page_start`
    pub fn new(fetcher: &'a F, query: &'a Query, tuning: &'a Tuning) -> Self {
        Self {
            fetcher,
            query,
            tuning,
            next_page: query.page_start,
            finished: false,
            known_total: None,
            skipped: Vec::new(),
        }
    }

    /// Fetches and returns the next page, or None when the walk is over
    ///
    /// Bounded mode ends after `page_end` inclusive; unbounded mode ends at
    /// the first page without tenders or at the hard page cap. Pages are
    /// visited exactly once, in ascending order.
    pub async fn next_page(&mut self) -> Option<PageResult> {
        if self.finished {
            return None;
        }

        let page = self.next_page;

        if !self.query.is_unbounded() && page > self.query.page_end {
            self.finished = true;
            return None;
        }

        // A skipped page does not end the walk, but the portal-reported page
        // count from any successful page still bounds it
        if matches!(self.known_total, Some(total) if page > total) {
            self.finished = true;
            return None;
        }

        if self.query.is_unbounded()
            && page - self.query.page_start >= self.tuning.page_cap
        {
            tracing::warn!(
                "Hit hard page cap of {} pages without an end-of-results signal, stopping",
                self.tuning.page_cap
            );
            self.finished = true;
            return None;
        }

        self.next_page += 1;

        let html = match self.fetch_with_retries(page).await {
            Some(html) => html,
            None => {
                self.skipped.push(page);
                return Some(PageResult {
                    page_number: page,
                    tenders: Vec::new(),
                    signal: PageSignal::FetchFailed,
                });
            }
        };

        let listing = match extract_listing(&html) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("Page {}: unrecognized structure, skipping: {}", page, e);
                self.skipped.push(page);
                return Some(PageResult {
                    page_number: page,
                    tenders: Vec::new(),
                    signal: PageSignal::FetchFailed,
                });
            }
        };

        self.known_total = Some(listing.total_pages);

        // An empty result set ends the walk; so does reaching the portal's
        // reported last page
        let signal = if listing.tenders.is_empty() || page >= listing.total_pages {
            self.finished = true;
            PageSignal::NoMore
        } else {
            PageSignal::HasMore
        };

        tracing::info!(
            "Page {}: {} tenders ({:?})",
            page,
            listing.tenders.len(),
            signal
        );

        Some(PageResult {
            page_number: page,
            tenders: listing.tenders,
            signal,
        })
    }

    /// Pages skipped so far after exhausting retries
    pub fn skipped_pages(&self) -> &[u32] {
        &self.skipped
    }

    async fn fetch_with_retries(&self, page: u32) -> Option<String> {
        for attempt in 1..=self.tuning.fetch_attempts {
            match self.fetcher.fetch_listing(self.query, page).await {
                Ok(html) => return Some(html),
                Err(e) => {
                    tracing::warn!(
                        "Page {}: fetch attempt {}/{} failed: {}",
                        page,
                        attempt,
                        self.tuning.fetch_attempts,
                        e
                    );
                    if attempt < self.tuning.fetch_attempts {
                        tokio::time::sleep(Duration::from_millis(self.tuning.retry_backoff_ms))
                            .await;
                    }
                }
            }
        }
        None
    }
}
