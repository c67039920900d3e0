//! Portal access: URL construction and the HTTP page fetcher
//!
//! This module is the crate's only contact point with the procurement portal.
//! Everything above it works against the [`PortalFetcher`] trait, so the
//! pipeline can be exercised with a fake portal in tests.

mod client;
mod urls;

pub use client::{build_http_client, HttpFetcher, PortalFetcher};
pub use urls::{listing_url, tab_url, DetailTab, PORTAL_BASE};
