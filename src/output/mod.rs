//! Run reporting

mod summary;

pub use summary::{print_summary, RunSummary};
