//! End-of-run summary
//!
//! Every skipped page, degraded tender, and failed tab ends up here, so data
//! gaps in the archive are auditable after the fact.

use crate::pipeline::{RunMode, StageKind, StageOutcome};
use std::time::Duration;

/// Accounting for one finished stage run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Which stage ran
    pub stage: StageKind,

    /// Leader or follower
    pub mode: RunMode,

    /// Result pages successfully fetched and parsed (leader only)
    pub pages_visited: u32,

    /// Pages skipped after exhausting retries
    pub pages_skipped: Vec<u32>,

    /// Tenders with every tab persisted this run
    pub tenders_saved: usize,

    /// Tenders persisted with one or more tabs missing
    pub tenders_degraded: usize,

    /// Tenders already archived and left untouched
    pub tenders_skipped: usize,

    /// Tenders where no tab could be fetched
    pub tenders_failed: usize,

    /// (app_id, tab) pairs that permanently failed
    pub failed_tabs: Vec<(String, String)>,

    /// Size of the batch this run worked with
    pub batch_size: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Creates an empty summary for a starting run
    pub fn new(stage: StageKind, mode: RunMode) -> Self {
        Self {
            stage,
            mode,
            pages_visited: 0,
            pages_skipped: Vec::new(),
            tenders_saved: 0,
            tenders_degraded: 0,
            tenders_skipped: 0,
            tenders_failed: 0,
            failed_tabs: Vec::new(),
            batch_size: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Whether any page, tender, or tab was lost during the run
    pub fn has_errors(&self) -> bool {
        !self.pages_skipped.is_empty()
            || self.tenders_degraded > 0
            || self.tenders_failed > 0
            || !self.failed_tabs.is_empty()
    }

    /// Terminal state of the run
    pub fn outcome(&self) -> StageOutcome {
        if self.has_errors() {
            StageOutcome::CompletedWithErrors
        } else {
            StageOutcome::Completed
        }
    }
}

/// Prints the run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run Summary: {} ({}) ===\n", summary.stage, summary.mode);

    if summary.mode == RunMode::Leader {
        println!("Pages:");
        println!("  Visited: {}", summary.pages_visited);
        if summary.pages_skipped.is_empty() {
            println!("  Skipped: 0");
        } else {
            println!(
                "  Skipped: {} ({})",
                summary.pages_skipped.len(),
                summary
                    .pages_skipped
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        println!();
    }

    println!("Tenders (batch of {}):", summary.batch_size);
    println!("  Saved: {}", summary.tenders_saved);
    println!("  Skipped (already archived): {}", summary.tenders_skipped);
    println!("  Degraded: {}", summary.tenders_degraded);
    println!("  Failed: {}", summary.tenders_failed);

    if !summary.failed_tabs.is_empty() {
        println!("\nPermanently failed tabs:");
        for (app_id, tab) in &summary.failed_tabs {
            println!("  - tender {} tab {}", app_id, tab);
        }
    }

    println!("\nElapsed: {:.1?}", summary.elapsed);
    match summary.outcome() {
        StageOutcome::Completed => println!("Outcome: completed"),
        StageOutcome::CompletedWithErrors => {
            println!("Outcome: completed with errors (see skips above)")
        }
    }
}
