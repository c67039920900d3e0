//! The batched acquisition pipeline
//!
//! Three cooperating pieces:
//! - the pagination walker drives the search index page by page
//! - the detail harvester persists one tender's detail tabs
//! - the stage orchestrates both in leader mode, or replays a recorded
//!   batch in follower mode

pub mod harvester;
pub mod stage;
pub mod walker;

pub use harvester::{HarvestOutcome, Harvester};
pub use stage::Stage;
pub use walker::{PageResult, PageSignal, Walker};

use crate::portal::DetailTab;

/// The three downloader stages
///
/// Every stage runs the same pipeline; they differ in which detail tabs they
/// persist and which output directory they own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Main-application documents (overview, main data, docs, bids)
    AppDocs,
    /// Documents uploaded by the procuring agency
    AgencyDocs,
    /// Agreement documents
    AgreementDocs,
}

impl StageKind {
    /// All stages, in canonical order
    pub const ALL: [StageKind; 3] = [
        StageKind::AppDocs,
        StageKind::AgencyDocs,
        StageKind::AgreementDocs,
    ];

    /// Directory name of this stage within the archive base
    pub fn dir_name(&self) -> &'static str {
        match self {
            StageKind::AppDocs => "app_docs",
            StageKind::AgencyDocs => "agency_docs",
            StageKind::AgreementDocs => "agreement_docs",
        }
    }

    /// The detail tabs this stage persists per tender
    pub fn tabs(&self) -> &'static [DetailTab] {
        match self {
            StageKind::AppDocs => &[
                DetailTab::Application,
                DetailTab::AppMain,
                DetailTab::AppDocs,
                DetailTab::AppBids,
            ],
            StageKind::AgencyDocs => &[DetailTab::AgencyDocs],
            StageKind::AgreementDocs => &[DetailTab::AgrDocs],
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// How a stage acquires its tender-ID universe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Discover ids via live pagination and write the batch ledger
    Leader,
    /// Replay the ids recorded by the last leader run
    Follower,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Leader => f.write_str("leader"),
            RunMode::Follower => f.write_str("follower"),
        }
    }
}

/// Terminal state of a finished stage run
///
/// Aborts (missing ledger, configuration errors) surface as `Err` from the
/// stage instead, before any per-tender work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Every page and tender processed cleanly
    Completed,
    /// The run finished, but some pages, tenders, or tabs were skipped
    CompletedWithErrors,
}
