//! Extraction of tender data from portal HTML

mod listing;

pub use listing::{extract_listing, Listing, TenderSummary};
