//! Applying one candidate to the catalog.
//!
//! Insert-if-new, otherwise report the match. Nothing is ever updated: a name
//! or position match always means "already present". Each [`MergeEngine::apply`]
//! call stands alone; its failure is reported in the outcome and never
//! poisons later calls.

use tracing::{debug, info, instrument, warn};

use frbsync_shared::{CandidateRecord, FrbSyncError, MergeMode, Result};
use frbsync_storage::Catalog;

use crate::field_map;
use crate::resolver::{DuplicateMatch, DuplicateResolver};

/// What happened to a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeKind {
    /// Inserted (commit mode).
    Added,
    /// Would have been inserted (dry-run mode).
    WouldAdd,
    /// Already in the catalog.
    Duplicate(DuplicateMatch),
    /// Malformed, or the store refused the row.
    Failed,
}

/// Result of applying one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub accepted: bool,
    pub message: String,
    pub kind: OutcomeKind,
}

impl MergeOutcome {
    fn added(name: &str) -> Self {
        Self {
            accepted: true,
            message: format!("added {name}"),
            kind: OutcomeKind::Added,
        }
    }

    fn would_add(name: &str) -> Self {
        Self {
            accepted: true,
            message: format!("would add {name}"),
            kind: OutcomeKind::WouldAdd,
        }
    }

    fn duplicate(found: DuplicateMatch) -> Self {
        Self {
            accepted: false,
            message: format!("duplicate of {}", found.existing_name),
            kind: OutcomeKind::Duplicate(found),
        }
    }

    pub(crate) fn failed(err: &FrbSyncError) -> Self {
        Self {
            accepted: false,
            message: format!("error: {err}"),
            kind: OutcomeKind::Failed,
        }
    }
}

/// Resolves duplicates and writes new bursts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    resolver: DuplicateResolver,
}

impl MergeEngine {
    pub fn new(resolver: DuplicateResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &DuplicateResolver {
        &self.resolver
    }

    /// Apply `candidate` under `mode`.
    ///
    /// Per-candidate problems (malformed input, storage refusals) come back as
    /// a failed [`MergeOutcome`]. Only a fatal error, the catalog becoming
    /// unavailable, is returned as `Err`.
    #[instrument(skip_all, fields(candidate = %candidate.tns_name, %mode))]
    pub async fn apply(
        &self,
        catalog: &Catalog,
        candidate: &CandidateRecord,
        mode: MergeMode,
    ) -> Result<MergeOutcome> {
        match self.try_apply(catalog, candidate, mode).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "candidate not applied");
                Ok(MergeOutcome::failed(&e))
            }
        }
    }

    async fn try_apply(
        &self,
        catalog: &Catalog,
        candidate: &CandidateRecord,
        mode: MergeMode,
    ) -> Result<MergeOutcome> {
        candidate.validate()?;
        let name = candidate.canonical_name();

        if let Some(found) = self.resolver.find_duplicate(catalog, candidate).await? {
            info!(existing = %found.existing_name, "duplicate");
            return Ok(MergeOutcome::duplicate(found));
        }

        if mode.is_dry_run() {
            info!(%name, "new burst (dry run)");
            return Ok(MergeOutcome::would_add(&name));
        }

        let mut row = field_map::build_row(candidate);
        let declared = catalog.columns().await?;
        let dropped = row.retain_declared(&declared);
        if !dropped.is_empty() {
            debug!(?dropped, "columns not defined by catalog");
        }

        catalog.insert(&row).await?;
        info!(%name, "added");
        Ok(MergeOutcome::added(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const ARCSEC: f64 = 1.0 / 3600.0;

    fn temp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("frbsync_merge_{}.db", Uuid::now_v7()))
    }

    async fn test_catalog() -> Catalog {
        Catalog::open(&temp_path()).await.expect("open test db")
    }

    fn dsa_burst() -> CandidateRecord {
        let mut c = CandidateRecord::new("FRB 20240501A", 188.736, 45.209);
        c.dm_exgal = Some(425.3);
        c.redshift = Some(0.312);
        c.survey = Some("DSA-110".into());
        c
    }

    #[tokio::test]
    async fn commit_adds_new_burst() {
        let catalog = test_catalog().await;
        let engine = MergeEngine::default();

        let outcome = engine
            .apply(&catalog, &dsa_burst(), MergeMode::Commit)
            .await
            .unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.message, "added FRB20240501A");
        assert_eq!(outcome.kind, OutcomeKind::Added);

        assert_eq!(catalog.count().await.unwrap(), 1);
        let record = catalog.get("FRB20240501A").await.unwrap().expect("stored");
        assert_eq!(record.dm, Some(425.3));
        assert_eq!(record.redshift, Some(0.312));
        assert_eq!(record.telescope.as_deref(), Some("DSA-110"));
    }

    #[tokio::test]
    async fn second_commit_is_duplicate() {
        let catalog = test_catalog().await;
        let engine = MergeEngine::default();

        let first = engine.apply(&catalog, &dsa_burst(), MergeMode::Commit).await.unwrap();
        let second = engine.apply(&catalog, &dsa_burst(), MergeMode::Commit).await.unwrap();

        assert!(first.accepted);
        assert!(!second.accepted);
        assert_eq!(second.message, "duplicate of FRB20240501A");
        assert_eq!(catalog.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn nearby_burst_with_other_name_is_duplicate() {
        let catalog = test_catalog().await;
        let engine = MergeEngine::default();
        engine.apply(&catalog, &dsa_burst(), MergeMode::Commit).await.unwrap();

        let neighbour = CandidateRecord::new("FRB 20240502B", 188.736, 45.209 + 3.0 * ARCSEC);
        let outcome = engine.apply(&catalog, &neighbour, MergeMode::Commit).await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.message, "duplicate of FRB20240501A");
        assert!(matches!(
            outcome.kind,
            OutcomeKind::Duplicate(DuplicateMatch { .. })
        ));
        assert_eq!(catalog.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        let catalog = test_catalog().await;
        let engine = MergeEngine::default();

        for _ in 0..3 {
            let outcome = engine.apply(&catalog, &dsa_burst(), MergeMode::DryRun).await.unwrap();
            assert!(outcome.accepted);
            assert_eq!(outcome.message, "would add FRB20240501A");
        }
        assert_eq!(catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dry_run_still_reports_duplicates() {
        let catalog = test_catalog().await;
        let engine = MergeEngine::default();
        engine.apply(&catalog, &dsa_burst(), MergeMode::Commit).await.unwrap();

        let outcome = engine.apply(&catalog, &dsa_burst(), MergeMode::DryRun).await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.message, "duplicate of FRB20240501A");
    }

    #[tokio::test]
    async fn malformed_candidate_is_reported() {
        let catalog = test_catalog().await;
        let mut c = dsa_burst();
        c.ra = None;

        let outcome = MergeEngine::default()
            .apply(&catalog, &c, MergeMode::Commit)
            .await
            .unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert_eq!(outcome.message, "error: malformed candidate: missing ra");
        assert_eq!(catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn optional_fields_dropped_for_narrow_catalog() {
        let path = temp_path();
        {
            let db = libsql::Builder::new_local(&path).build().await.unwrap();
            let conn = db.connect().unwrap();
            conn.execute_batch("CREATE TABLE frbs (Name TEXT UNIQUE, ra REAL, dec REAL, z REAL);")
                .await
                .unwrap();
        }
        let catalog = Catalog::open(&path).await.unwrap();

        let outcome = MergeEngine::default()
            .apply(&catalog, &dsa_burst(), MergeMode::Commit)
            .await
            .unwrap();
        assert!(outcome.accepted, "{}", outcome.message);

        let record = catalog.get("FRB20240501A").await.unwrap().expect("stored");
        assert_eq!(record.redshift, Some(0.312));
        assert_eq!(record.dm, None);
        assert_eq!(record.telescope, None);
    }

    #[tokio::test]
    async fn catalog_without_coordinates_cannot_accept() {
        let path = temp_path();
        {
            let db = libsql::Builder::new_local(&path).build().await.unwrap();
            let conn = db.connect().unwrap();
            conn.execute_batch("CREATE TABLE frbs (Name TEXT UNIQUE, ra REAL, dm REAL);")
                .await
                .unwrap();
        }
        let catalog = Catalog::open(&path).await.unwrap();

        // The positional scan itself fails on this table.
        let outcome = MergeEngine::default()
            .apply(&catalog, &dsa_burst(), MergeMode::Commit)
            .await
            .unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.message.starts_with("error: "));
        assert_eq!(catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn storage_refusal_is_per_candidate() {
        let tmp = temp_path();
        let rw = Catalog::open(&tmp).await.unwrap();
        drop(rw);
        let ro = Catalog::open_readonly(&tmp).await.unwrap();

        let outcome = MergeEngine::default()
            .apply(&ro, &dsa_burst(), MergeMode::Commit)
            .await
            .unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.message.contains("read-only"));
    }

    #[tokio::test]
    async fn extra_reference_list_is_stored() {
        let catalog = test_catalog().await;
        let mut c = dsa_burst();
        c.extra.insert(
            "refs".into(),
            serde_json::json!(["ATel 16600", "arXiv:2405.00001"]),
        );
        MergeEngine::default()
            .apply(&catalog, &c, MergeMode::Commit)
            .await
            .unwrap();

        let record = catalog.get("FRB20240501A").await.unwrap().unwrap();
        assert_eq!(record.references, vec!["ATel 16600", "arXiv:2405.00001"]);
    }
}
