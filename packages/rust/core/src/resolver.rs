//! Duplicate detection against the catalog.
//!
//! A candidate duplicates an existing record if either
//! 1. one of its name spellings is stored verbatim, or
//! 2. some stored position lies within the match radius.
//!
//! Name identity is checked first and wins outright. Among several positions
//! within the radius the first in scan order is reported; the catalog never
//! holds two distinct bursts that close, so a tie means the catalog itself is
//! inconsistent.

use tracing::{debug, instrument};

use frbsync_shared::{CandidateRecord, DEFAULT_MATCH_RADIUS_ARCSEC, Result, name_variants};
use frbsync_storage::Catalog;

use crate::geometry::angular_separation;

/// Why a candidate was judged to be already present.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchKind {
    /// A name spelling matched exactly.
    Name,
    /// Positions agree to within the match radius.
    Position { separation_arcsec: f64 },
}

/// An existing catalog entry the candidate duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    pub existing_name: String,
    pub kind: MatchKind,
}

/// Finds the catalog entry, if any, that a candidate duplicates.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateResolver {
    radius_arcsec: f64,
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_RADIUS_ARCSEC)
    }
}

impl DuplicateResolver {
    pub fn new(radius_arcsec: f64) -> Self {
        Self { radius_arcsec }
    }

    pub fn radius_arcsec(&self) -> f64 {
        self.radius_arcsec
    }

    /// Look the candidate up by name, then by position.
    #[instrument(skip_all, fields(candidate = %candidate.tns_name))]
    pub async fn find_duplicate(
        &self,
        catalog: &Catalog,
        candidate: &CandidateRecord,
    ) -> Result<Option<DuplicateMatch>> {
        let variants = name_variants(&candidate.tns_name);
        if let Some(existing_name) = catalog.find_by_name(&variants).await? {
            debug!(%existing_name, "name match");
            return Ok(Some(DuplicateMatch {
                existing_name,
                kind: MatchKind::Name,
            }));
        }

        let (Some(ra), Some(dec)) = (candidate.ra, candidate.dec) else {
            return Ok(None);
        };

        for entry in catalog.all_positions().await? {
            let (Some(entry_ra), Some(entry_dec)) = (entry.ra, entry.dec) else {
                continue;
            };
            let separation_arcsec = angular_separation(ra, dec, entry_ra, entry_dec);
            if separation_arcsec < self.radius_arcsec {
                debug!(existing_name = %entry.name, separation_arcsec, "positional match");
                return Ok(Some(DuplicateMatch {
                    existing_name: entry.name,
                    kind: MatchKind::Position { separation_arcsec },
                }));
            }
        }

        Ok(None)
    }
}
