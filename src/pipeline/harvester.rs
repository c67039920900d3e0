//! Detail harvester
//!
//! Persists one tender's detail tabs into the stage archive and registers
//! the tender into the run's shared ID accumulator. Tab fetches are
//! independently retried; losing one tab downgrades the outcome instead of
//! discarding the tabs already saved. Harvesting is idempotent: a tender
//! whose tabs are all on disk is skipped without a single fetch, which makes
//! interrupted runs safe to resume.

use crate::archive::{write_atomic, ProjectPaths};
use crate::config::Tuning;
use crate::ledger::BatchEntry;
use crate::pipeline::StageKind;
use crate::portal::{DetailTab, PortalFetcher};
use crate::Result;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of harvesting one tender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// Every tab fetched and persisted
    Saved,
    /// Some tabs persisted, the named ones permanently failed
    Degraded { failed_tabs: Vec<DetailTab> },
    /// No tab could be fetched
    Failed,
    /// Already fully persisted; nothing fetched
    Skipped,
}

/// Harvests tender detail tabs for one stage
///
/// Cheap to clone; clones share the fetcher, the archive paths, and the ID
/// accumulator, so one harvester can be fanned out across worker tasks.
pub struct Harvester<F> {
    fetcher: Arc<F>,
    paths: Arc<ProjectPaths>,
    stage: StageKind,
    tuning: Tuning,
    update: bool,
    accumulator: Arc<Mutex<BTreeSet<BatchEntry>>>,
}

impl<F> Clone for Harvester<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            paths: Arc::clone(&self.paths),
            stage: self.stage,
            tuning: self.tuning.clone(),
            update: self.update,
            accumulator: Arc::clone(&self.accumulator),
        }
    }
}

impl<F: PortalFetcher> Harvester<F> {
    /// Creates a harvester for one stage
    ///
    /// # Arguments
    ///
    /// * `update` - When set, re-harvest tenders even if fully persisted
    pub fn new(
        fetcher: Arc<F>,
        paths: Arc<ProjectPaths>,
        stage: StageKind,
        tuning: Tuning,
        update: bool,
    ) -> Self {
        Self {
            fetcher,
            paths,
            stage,
            tuning,
            update,
            accumulator: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Harvests one tender's tabs
    ///
    /// The tender is registered into the batch accumulator in every case —
    /// a discovered-but-degraded tender still belongs to the batch.
    pub async fn harvest(&self, entry: &BatchEntry) -> Result<HarvestOutcome> {
        self.register(entry);

        if !self.update && self.is_fully_persisted(&entry.app_id) {
            tracing::debug!("Tender {} already archived, skipping", entry.app_id);
            return Ok(HarvestOutcome::Skipped);
        }

        let tabs = self.stage.tabs();
        let mut failed_tabs = Vec::new();

        for &tab in tabs {
            match self.fetch_tab_with_retries(entry, tab).await {
                Some(html) => {
                    let path = self.paths.tab_path(self.stage, &entry.app_id, tab);
                    write_atomic(&path, html.as_bytes())?;
                    tracing::debug!("Saved {} for tender {}", tab, entry.app_id);
                }
                None => {
                    tracing::warn!(
                        "Tender {}: tab {} permanently failed, continuing",
                        entry.app_id,
                        tab
                    );
                    failed_tabs.push(tab);
                }
            }
        }

        if failed_tabs.is_empty() {
            Ok(HarvestOutcome::Saved)
        } else if failed_tabs.len() == tabs.len() {
            Ok(HarvestOutcome::Failed)
        } else {
            Ok(HarvestOutcome::Degraded { failed_tabs })
        }
    }

    /// Snapshot of the accumulated batch entries
    pub fn accumulated(&self) -> BTreeSet<BatchEntry> {
        self.accumulator
            .lock()
            .map(|set| set.clone())
            .unwrap_or_default()
    }

    fn register(&self, entry: &BatchEntry) {
        if let Ok(mut set) = self.accumulator.lock() {
            set.insert(entry.clone());
        }
    }

    /// Whether every tab file for this stage already exists on disk
    fn is_fully_persisted(&self, app_id: &str) -> bool {
        self.stage
            .tabs()
            .iter()
            .all(|&tab| self.paths.tab_path(self.stage, app_id, tab).is_file())
    }

    async fn fetch_tab_with_retries(&self, entry: &BatchEntry, tab: DetailTab) -> Option<String> {
        for attempt in 1..=self.tuning.fetch_attempts {
            match self.fetcher.fetch_tab(&entry.app_id, &entry.key, tab).await {
                Ok(html) => return Some(html),
                Err(e) => {
                    tracing::warn!(
                        "Tender {}: tab {} attempt {}/{} failed: {}",
                        entry.app_id,
                        tab,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Query;
    use crate::{Result, SweepError};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    /// Fake portal serving tab bodies and counting tab fetches
    struct FakePortal {
        bodies: HashMap<(String, DetailTab), String>,
        failing_tabs: Vec<DetailTab>,
        fetches: StdMutex<u32>,
    }

    impl FakePortal {
        fn new() -> Self {
            Self {
                bodies: HashMap::new(),
                failing_tabs: Vec::new(),
                fetches: StdMutex::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            *self.fetches.lock().unwrap()
        }
    }

    impl PortalFetcher for FakePortal {
        async fn fetch_listing(&self, _query: &Query, _page: u32) -> Result<String> {
            unreachable!("harvester never fetches listings")
        }

        async fn fetch_tab(&self, app_id: &str, _key: &str, tab: DetailTab) -> Result<String> {
            *self.fetches.lock().unwrap() += 1;
            if self.failing_tabs.contains(&tab) {
                return Err(SweepError::Timeout {
                    url: format!("{}-{}", app_id, tab),
                });
            }
            Ok(self
                .bodies
                .get(&(app_id.to_string(), tab))
                .cloned()
                .unwrap_or_else(|| format!("<html>{} {}</html>", app_id, tab)))
        }
    }

    fn entry(app_id: &str) -> BatchEntry {
        BatchEntry {
            app_id: app_id.to_string(),
            key: format!("key-{}", app_id),
        }
    }

    fn fast_tuning() -> Tuning {
        Tuning {
            fetch_attempts: 2,
            retry_backoff_ms: 1,
            ..Tuning::default()
        }
    }

    fn harvester(
        portal: FakePortal,
        root: &TempDir,
        stage: StageKind,
        update: bool,
    ) -> Harvester<FakePortal> {
        let paths = ProjectPaths::new(root.path(), "71200000").unwrap();
        Harvester::new(
            Arc::new(portal),
            Arc::new(paths),
            stage,
            fast_tuning(),
            update,
        )
    }

    #[tokio::test]
    async fn test_saves_every_stage_tab() {
        let root = TempDir::new().unwrap();
        let h = harvester(FakePortal::new(), &root, StageKind::AppDocs, false);

        let outcome = h.harvest(&entry("100")).await.unwrap();
        assert_eq!(outcome, HarvestOutcome::Saved);

        for &tab in StageKind::AppDocs.tabs() {
            assert!(h.paths.tab_path(StageKind::AppDocs, "100", tab).is_file());
        }
    }

    #[tokio::test]
    async fn test_partial_failure_is_degraded_and_keeps_saved_tabs() {
        let root = TempDir::new().unwrap();
        let mut portal = FakePortal::new();
        portal.failing_tabs = vec![DetailTab::AppBids];
        let h = harvester(portal, &root, StageKind::AppDocs, false);

        let outcome = h.harvest(&entry("100")).await.unwrap();
        assert_eq!(
            outcome,
            HarvestOutcome::Degraded {
                failed_tabs: vec![DetailTab::AppBids]
            }
        );

        assert!(h
            .paths
            .tab_path(StageKind::AppDocs, "100", DetailTab::AppMain)
            .is_file());
        assert!(!h
            .paths
            .tab_path(StageKind::AppDocs, "100", DetailTab::AppBids)
            .is_file());
    }

    #[tokio::test]
    async fn test_all_tabs_failing_is_failed_but_still_registered() {
        let root = TempDir::new().unwrap();
        let mut portal = FakePortal::new();
        portal.failing_tabs = vec![DetailTab::AgrDocs];
        let h = harvester(portal, &root, StageKind::AgreementDocs, false);

        let outcome = h.harvest(&entry("100")).await.unwrap();
        assert_eq!(outcome, HarvestOutcome::Failed);

        let ids: Vec<String> = h.accumulated().iter().map(|e| e.app_id.clone()).collect();
        assert_eq!(ids, vec!["100".to_string()]);
    }

    #[tokio::test]
    async fn test_second_harvest_is_a_no_op() {
        let root = TempDir::new().unwrap();
        let h = harvester(FakePortal::new(), &root, StageKind::AgencyDocs, false);

        assert_eq!(h.harvest(&entry("7")).await.unwrap(), HarvestOutcome::Saved);
        let fetches_after_first = h.fetcher.fetch_count();
        let path = h.paths.tab_path(StageKind::AgencyDocs, "7", DetailTab::AgencyDocs);
        let bytes_after_first = std::fs::read(&path).unwrap();

        assert_eq!(
            h.harvest(&entry("7")).await.unwrap(),
            HarvestOutcome::Skipped
        );
        assert_eq!(h.fetcher.fetch_count(), fetches_after_first);
        assert_eq!(std::fs::read(&path).unwrap(), bytes_after_first);
    }

    #[tokio::test]
    async fn test_update_flag_forces_refetch() {
        let root = TempDir::new().unwrap();
        let h = harvester(FakePortal::new(), &root, StageKind::AgencyDocs, true);

        assert_eq!(h.harvest(&entry("7")).await.unwrap(), HarvestOutcome::Saved);
        assert_eq!(h.harvest(&entry("7")).await.unwrap(), HarvestOutcome::Saved);
        // One tab per stage, fetched twice
        assert_eq!(h.fetcher.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_degraded_tender_registers_into_batch() {
        let root = TempDir::new().unwrap();
        let mut portal = FakePortal::new();
        portal.failing_tabs = vec![DetailTab::AppBids];
        let h = harvester(portal, &root, StageKind::AppDocs, false);

        h.harvest(&entry("1")).await.unwrap();
        h.harvest(&entry("2")).await.unwrap();

        let ids: Vec<String> = h.accumulated().iter().map(|e| e.app_id.clone()).collect();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn test_partially_persisted_tender_is_completed_not_skipped() {
        let root = TempDir::new().unwrap();
        let h = harvester(FakePortal::new(), &root, StageKind::AppDocs, false);

        // Only one of four tabs on disk
        write_atomic(
            &h.paths.tab_path(StageKind::AppDocs, "9", DetailTab::AppMain),
            b"partial",
        )
        .unwrap();

        let outcome = h.harvest(&entry("9")).await.unwrap();
        assert_eq!(outcome, HarvestOutcome::Saved);
        assert!(h
            .paths
            .tab_path(StageKind::AppDocs, "9", DetailTab::AppBids)
            .is_file());
    }
}
