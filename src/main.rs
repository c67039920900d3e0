//! Tendersweep main entry point
//!
//! This is the command-line interface for the tendersweep archive pipeline.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tendersweep::archive::ProjectPaths;
use tendersweep::config::{
    default_date_range, load_tuning, parse_portal_date, validate_query, validate_tuning,
};
use tendersweep::output::print_summary;
use tendersweep::pipeline::Stage;
use tendersweep::portal::{build_http_client, HttpFetcher, PORTAL_BASE};
use tendersweep::{Query, RunMode, StageKind, SweepError, Tuning};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Tendersweep: a batched tender-archive pipeline
///
/// Tendersweep walks a procurement portal's search results for one CPV code
/// and date window, archives each tender's detail tabs, and coordinates the
/// three downloader stages through a shared batch ledger.
#[derive(Parser, Debug)]
#[command(name = "tendersweep")]
#[command(version = "1.0.0")]
#[command(about = "A batched tender-archive pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    stage: StageCommand,
}

/// One downloader stage per invocation
#[derive(Subcommand, Debug)]
enum StageCommand {
    /// Archive application tabs (leader by default)
    AppDocs(StageArgs),

    /// Archive agency document tabs
    AgencyDocs(StageArgs),

    /// Archive agreement document tabs
    AgreementDocs(StageArgs),
}

impl StageCommand {
    fn kind(&self) -> StageKind {
        match self {
            StageCommand::AppDocs(_) => StageKind::AppDocs,
            StageCommand::AgencyDocs(_) => StageKind::AgencyDocs,
            StageCommand::AgreementDocs(_) => StageKind::AgreementDocs,
        }
    }

    fn args(&self) -> &StageArgs {
        match self {
            StageCommand::AppDocs(args)
            | StageCommand::AgencyDocs(args)
            | StageCommand::AgreementDocs(args) => args,
        }
    }
}

#[derive(Args, Debug)]
struct StageArgs {
    /// CPV classification code to search for
    #[arg(short, long, value_name = "CODE")]
    cpv: String,

    /// First announcement date, DD.MM.YYYY (default: first day of previous month)
    #[arg(long, value_name = "DATE", conflicts_with = "use_last_batch")]
    date_from: Option<String>,

    /// Last announcement date, DD.MM.YYYY (default: yesterday)
    #[arg(long, value_name = "DATE", conflicts_with = "use_last_batch")]
    date_till: Option<String>,

    /// First result page to process
    #[arg(long, value_name = "N", default_value_t = 1, conflicts_with = "use_last_batch")]
    page_start: u32,

    /// Last result page inclusive; 0 walks until the portal runs out
    #[arg(long, value_name = "N", default_value_t = 0, conflicts_with = "use_last_batch")]
    page_end: u32,

    /// Root directory for the archive
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Run as follower: replay the batch recorded by a previous leader run
    /// instead of walking the search index
    #[arg(long)]
    use_last_batch: bool,

    /// Re-harvest tenders even when already fully archived
    #[arg(long)]
    update: bool,

    /// Path to an optional TOML tuning file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let args = cli.stage.args();

    setup_logging(args.verbose, args.quiet);

    match run(cli.stage.kind(), args).await {
        Ok(()) => {}
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

async fn run(kind: StageKind, args: &StageArgs) -> Result<(), SweepError> {
    let tuning = match &args.config {
        Some(path) => {
            tracing::info!("Loading tuning from: {}", path.display());
            load_tuning(path).map_err(SweepError::Config)?
        }
        None => {
            let tuning = Tuning::default();
            validate_tuning(&tuning).map_err(SweepError::Config)?;
            tuning
        }
    };

    let query = build_query(args)?;
    validate_query(&query).map_err(SweepError::Config)?;

    let mode = if args.use_last_batch {
        RunMode::Follower
    } else {
        RunMode::Leader
    };

    let paths = ProjectPaths::new(&args.root, &query.cpv_code)?;
    tracing::info!("Archive directory: {}", paths.base_dir().display());

    let client = build_http_client(&tuning)?;
    let base = Url::parse(PORTAL_BASE)?;
    let fetcher = HttpFetcher::new(client, base);

    let stage = Stage::new(
        Arc::new(fetcher),
        Arc::new(paths),
        kind,
        query,
        tuning,
        args.update,
    );

    let summary = stage.run(mode).await?;
    if !args.quiet {
        print_summary(&summary);
    }
    Ok(())
}

/// Builds the search query from CLI arguments, filling in the default date
/// window where no explicit dates were given
fn build_query(args: &StageArgs) -> Result<Query, SweepError> {
    let (default_from, default_till) = default_date_range();
    let date_from = match &args.date_from {
        Some(value) => parse_portal_date(value).map_err(SweepError::Config)?,
        None => default_from,
    };
    let date_till = match &args.date_till {
        Some(value) => parse_portal_date(value).map_err(SweepError::Config)?,
        None => default_till,
    };

    Ok(Query {
        cpv_code: args.cpv.clone(),
        date_from,
        date_till,
        page_start: args.page_start,
        page_end: args.page_end,
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tendersweep=info,warn"),
            1 => EnvFilter::new("tendersweep=debug,info"),
            2 => EnvFilter::new("tendersweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Maps fatal errors to process exit codes
///
/// Configuration problems exit 1, a missing or unusable ledger exits 2 so a
/// wrapper script can tell "fix the flags" apart from "run the leader first".
fn exit_code_for(error: &SweepError) -> i32 {
    match error {
        SweepError::Config(_) => 1,
        SweepError::Ledger(_) => 2,
        _ => 1,
    }
}
