//! Downloader stage orchestration
//!
//! A stage runs in one of two modes, fixed at start:
//! - **leader**: walk the search index, harvest every discovered tender,
//!   then write the batch ledger for the followers
//! - **follower**: read the batch ledger and harvest exactly the recorded
//!   tender set, never touching the search index
//!
//! Per-page and per-tender failures are tallied and reported; only ledger
//! and configuration failures abort a run.

use crate::archive::{export_manifest, ProjectPaths};
use crate::config::{Query, Tuning};
use crate::ledger::{self, BatchEntry, BatchRecord};
use crate::output::RunSummary;
use crate::pipeline::harvester::{HarvestOutcome, Harvester};
use crate::pipeline::walker::{PageSignal, Walker};
use crate::pipeline::{RunMode, StageKind};
use crate::portal::PortalFetcher;
use crate::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One downloader stage bound to a query and archive
pub struct Stage<F> {
    fetcher: Arc<F>,
    paths: Arc<ProjectPaths>,
    kind: StageKind,
    query: Query,
    tuning: Tuning,
    update: bool,
}

impl<F: PortalFetcher + 'static> Stage<F> {
    /// Creates a stage
    pub fn new(
        fetcher: Arc<F>,
        paths: Arc<ProjectPaths>,
        kind: StageKind,
        query: Query,
        tuning: Tuning,
        update: bool,
    ) -> Self {
        Self {
            fetcher,
            paths,
            kind,
            query,
            tuning,
            update,
        }
    }

    /// Runs the stage in the given mode
    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        match mode {
            RunMode::Leader => self.run_leader().await,
            RunMode::Follower => self.run_follower().await,
        }
    }

    /// Leader mode: discover, harvest, then record the batch
    pub async fn run_leader(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::new(self.kind, RunMode::Leader);

        tracing::info!(
            "Stage {} (leader): cpv {}, {} - {}, pages {}..{}",
            self.kind,
            self.query.cpv_code,
            self.query.date_from.format("%d.%m.%Y"),
            self.query.date_till.format("%d.%m.%Y"),
            self.query.page_start,
            if self.query.is_unbounded() {
                "end".to_string()
            } else {
                self.query.page_end.to_string()
            }
        );

        // Stage 1: collect the tender universe from the search index
        let mut walker = Walker::new(self.fetcher.as_ref(), &self.query, &self.tuning);
        let mut entries: Vec<BatchEntry> = Vec::new();
        let mut seen = BTreeSet::new();

        while let Some(page) = walker.next_page().await {
            match page.signal {
                PageSignal::FetchFailed => {}
                _ => summary.pages_visited += 1,
            }
            for tender in &page.tenders {
                if seen.insert(tender.app_id.clone()) {
                    entries.push(BatchEntry::from(tender));
                }
            }
        }
        summary.pages_skipped = walker.skipped_pages().to_vec();
        summary.batch_size = entries.len();

        tracing::info!(
            "Discovered {} tenders across {} pages ({} skipped)",
            entries.len(),
            summary.pages_visited,
            summary.pages_skipped.len()
        );

        // Stage 2: harvest, then record the batch for the followers
        let harvester = Harvester::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.paths),
            self.kind,
            self.tuning.clone(),
            self.update,
        );
        self.harvest_all(&harvester, entries, &mut summary).await;

        // An unwritten ledger breaks every follower, so this failure is fatal
        let record = BatchRecord::new(&self.query.cpv_code, harvester.accumulated());
        ledger::write(&self.paths.ledger_path(), &record)?;

        self.finish(&mut summary, start);
        Ok(summary)
    }

    /// Follower mode: replay the recorded batch
    pub async fn run_follower(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::new(self.kind, RunMode::Follower);

        let record = ledger::read(&self.paths.ledger_path())?;
        if record.cpv_code != self.query.cpv_code {
            tracing::warn!(
                "Ledger was written for cpv {} but this run targets {}",
                record.cpv_code,
                self.query.cpv_code
            );
        }

        tracing::info!(
            "Stage {} (follower): replaying batch of {} tenders written at {}",
            self.kind,
            record.entries.len(),
            record.written_at
        );

        summary.batch_size = record.entries.len();

        let harvester = Harvester::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.paths),
            self.kind,
            self.tuning.clone(),
            self.update,
        );
        self.harvest_all(&harvester, record.entries, &mut summary)
            .await;

        self.finish(&mut summary, start);
        Ok(summary)
    }

    /// Harvests a batch concurrently under the configured worker limit
    ///
    /// Tender outputs are disjoint directories, so harvests only share the
    /// ID accumulator inside the harvester.
    async fn harvest_all(
        &self,
        harvester: &Harvester<F>,
        entries: Vec<BatchEntry>,
        summary: &mut RunSummary,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.tuning.max_concurrent_harvests as usize));
        let mut tasks = JoinSet::new();

        for entry in entries {
            let semaphore = Arc::clone(&semaphore);
            let harvester = harvester.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = harvester.harvest(&entry).await;
                (entry, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (entry, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Harvest task panicked: {}", e);
                    summary.tenders_failed += 1;
                    continue;
                }
            };

            match outcome {
                Ok(HarvestOutcome::Saved) => summary.tenders_saved += 1,
                Ok(HarvestOutcome::Skipped) => summary.tenders_skipped += 1,
                Ok(HarvestOutcome::Degraded { failed_tabs }) => {
                    summary.tenders_degraded += 1;
                    for tab in failed_tabs {
                        summary.failed_tabs.push((entry.app_id.clone(), tab.to_string()));
                    }
                }
                Ok(HarvestOutcome::Failed) => {
                    summary.tenders_failed += 1;
                    for &tab in self.kind.tabs() {
                        summary.failed_tabs.push((entry.app_id.clone(), tab.to_string()));
                    }
                }
                Err(e) => {
                    tracing::error!("Tender {}: harvest failed: {}", entry.app_id, e);
                    summary.tenders_failed += 1;
                }
            }
        }
    }

    fn finish(&self, summary: &mut RunSummary, start: Instant) {
        if let Err(e) = export_manifest(&self.paths, self.kind) {
            tracing::warn!("Manifest export failed: {}", e);
        }
        summary.elapsed = start.elapsed();
        tracing::info!(
            "Stage {} finished in {:.1?}: {} saved, {} skipped, {} degraded, {} failed",
            self.kind,
            summary.elapsed,
            summary.tenders_saved,
            summary.tenders_skipped,
            summary.tenders_degraded,
            summary.tenders_failed
        );
    }
}
