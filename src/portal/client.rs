//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests against the portal:
//! - Building the HTTP client with a proper user agent and timeouts
//! - Fetching search-listing pages and tender detail tabs
//! - Classifying transport failures (timeout vs connect vs HTTP status)
//!
//! A fetch here is a single attempt; bounded retry policy belongs to the
//! pagination walker and the detail harvester.

use crate::config::{Query, Tuning};
use crate::portal::urls::{listing_url, tab_url, DetailTab};
use crate::{Result, SweepError};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// The page-fetch collaborator the pipeline works against
///
/// Implemented by [`HttpFetcher`] for the real portal and by in-memory fakes
/// in tests. Each call is one network attempt; callers own the retry policy.
pub trait PortalFetcher: Send + Sync {
    /// Fetches the raw HTML of one search-result page
    fn fetch_listing(&self, query: &Query, page: u32)
        -> impl Future<Output = Result<String>> + Send;

    /// Fetches the raw HTML of one detail tab of a tender
    fn fetch_tab(
        &self,
        app_id: &str,
        key: &str,
        tab: DetailTab,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Builds an HTTP client configured for portal access
///
/// # Arguments
///
/// * `tuning` - Source of the request and connect timeouts
pub fn build_http_client(tuning: &Tuning) -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(tuning.request_timeout_secs))
        .connect_timeout(Duration::from_secs(tuning.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PortalFetcher`] backed by reqwest against a live portal
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    /// Creates a fetcher for the portal at `base`
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Performs one GET and returns the body, classifying failures
    ///
    /// Timeouts become `SweepError::Timeout`, non-2xx responses become
    /// `SweepError::HttpStatus`, everything else `SweepError::Fetch`.
    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SweepError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_error(url.as_str(), e))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> SweepError {
    if error.is_timeout() {
        SweepError::Timeout {
            url: url.to_string(),
        }
    } else {
        SweepError::Fetch {
            url: url.to_string(),
            source: error,
        }
    }
}

impl PortalFetcher for HttpFetcher {
    async fn fetch_listing(&self, query: &Query, page: u32) -> Result<String> {
        let url = listing_url(&self.base, query, page)?;
        tracing::debug!("Fetching listing page {}: {}", page, url);
        self.get_text(url).await
    }

    async fn fetch_tab(&self, app_id: &str, key: &str, tab: DetailTab) -> Result<String> {
        let url = tab_url(&self.base, app_id, key, tab)?;
        tracing::debug!("Fetching tab {} for tender {}", tab, app_id);
        self.get_text(url).await
    }
}
