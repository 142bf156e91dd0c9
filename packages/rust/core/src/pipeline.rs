//! End-to-end sync pipeline: oracle candidates → dedup → catalog.
//!
//! Candidates are applied strictly one at a time, in input order. A later
//! candidate's duplicate check sees the rows committed for earlier ones, so
//! two reports of the same new burst in one batch collapse to one entry.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use frbsync_shared::{CandidateRecord, MergeMode, Result, SyncConfig};
use frbsync_storage::Catalog;

use crate::extraction::DecodedCandidate;
use crate::merge::{MergeEngine, MergeOutcome, OutcomeKind};
use crate::resolver::DuplicateResolver;

/// Outcome for one candidate, in the order candidates were given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    /// Burst name as given by the oracle, or `#<index>` if unreadable.
    pub identifier: String,
    /// The decoded candidate; `None` if it could not be decoded.
    pub candidate: Option<CandidateRecord>,
    pub accepted: bool,
    pub message: String,
}

/// Result of one pipeline pass.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub mode: MergeMode,
    pub generated_at: DateTime<Utc>,
    /// Every candidate, in input order.
    pub outcomes: Vec<CandidateReport>,
    /// The accepted subset: added (commit) or would-add (dry run).
    pub accepted: Vec<CandidateReport>,
    pub duplicates: usize,
    pub errors: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl PipelineSummary {
    /// Names of the accepted candidates.
    pub fn accepted_names(&self) -> Vec<&str> {
        self.accepted.iter().map(|r| r.identifier.as_str()).collect()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each candidate has been applied.
    fn candidate_checked(&self, identifier: &str, message: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &PipelineSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn candidate_checked(&self, _identifier: &str, _message: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &PipelineSummary) {}
}

/// Apply `candidates` to an already-open catalog.
///
/// Per-candidate failures are recorded and processing continues. Returns
/// `Err` only if the catalog becomes unavailable.
#[instrument(skip_all, fields(%mode, candidates = candidates.len()))]
pub async fn run_pipeline(
    catalog: &Catalog,
    engine: &MergeEngine,
    candidates: Vec<DecodedCandidate>,
    mode: MergeMode,
    progress: &dyn ProgressReporter,
) -> Result<PipelineSummary> {
    let start = Instant::now();
    let total = candidates.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut duplicates = 0;
    let mut errors = 0;

    progress.phase("Checking candidates against catalog");

    for (i, decoded) in candidates.into_iter().enumerate() {
        let report = match decoded {
            Ok(candidate) => {
                let outcome = engine.apply(catalog, &candidate, mode).await?;
                match outcome.kind {
                    OutcomeKind::Duplicate(_) => duplicates += 1,
                    OutcomeKind::Failed => errors += 1,
                    OutcomeKind::Added | OutcomeKind::WouldAdd => {}
                }
                report_for(candidate, outcome)
            }
            Err(malformed) => {
                warn!(
                    index = malformed.index,
                    identifier = %malformed.identifier,
                    reason = %malformed.reason,
                    "skipping malformed candidate"
                );
                errors += 1;
                let outcome = MergeOutcome::failed(&malformed.to_error());
                CandidateReport {
                    identifier: malformed.identifier,
                    candidate: None,
                    accepted: outcome.accepted,
                    message: outcome.message,
                }
            }
        };

        progress.candidate_checked(&report.identifier, &report.message, i + 1, total);
        outcomes.push(report);
    }

    let accepted: Vec<CandidateReport> = outcomes.iter().filter(|r| r.accepted).cloned().collect();

    info!(
        total,
        accepted = accepted.len(),
        duplicates,
        errors,
        "pipeline complete"
    );

    let summary = PipelineSummary {
        mode,
        generated_at: Utc::now(),
        outcomes,
        accepted,
        duplicates,
        errors,
        elapsed: start.elapsed(),
    };
    progress.done(&summary);
    Ok(summary)
}

fn report_for(candidate: CandidateRecord, outcome: MergeOutcome) -> CandidateReport {
    CandidateReport {
        identifier: candidate.tns_name.clone(),
        candidate: Some(candidate),
        accepted: outcome.accepted,
        message: outcome.message,
    }
}

/// Open the configured catalog, run one pass, and release the catalog.
///
/// Dry runs open the catalog read-only. Failing to open is fatal and is
/// returned before any candidate is looked at.
#[instrument(skip_all, fields(catalog = %config.catalog_path.display(), mode = %config.mode))]
pub async fn sync_catalog(
    config: &SyncConfig,
    candidates: Vec<DecodedCandidate>,
    progress: &dyn ProgressReporter,
) -> Result<PipelineSummary> {
    progress.phase("Opening catalog");
    let catalog = match config.mode {
        MergeMode::DryRun => Catalog::open_readonly(&config.catalog_path).await?,
        MergeMode::Commit => Catalog::open(&config.catalog_path).await?,
    };

    info!(records = catalog.count().await?, "catalog opened");

    let engine = MergeEngine::new(DuplicateResolver::new(config.match_radius_arcsec));
    run_pipeline(&catalog, &engine, candidates, config.mode, progress).await
}
