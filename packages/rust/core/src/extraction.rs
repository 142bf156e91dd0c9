//! Boundary with the extraction oracle.
//!
//! Turning announcement prose into [`CandidateRecord`]s is done by an external
//! language-model service. This module only fixes the contract: the
//! [`ExtractionOracle`] trait, and decoding of the JSON the oracle emits.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use frbsync_shared::{CandidateRecord, FrbSyncError, Result};

/// An announcement (telegram or preprint abstract) to extract bursts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    /// Feed the announcement came from, e.g. `atel` or `arxiv`.
    pub source: String,
    /// Identifier within the feed, e.g. `ATel#16600`.
    pub id: String,
    pub title: String,
    pub authors: String,
    pub date: String,
    pub body: String,
    pub url: String,
}

/// Produces typed candidates from an announcement.
pub trait ExtractionOracle {
    fn extract(
        &self,
        announcement: &Announcement,
    ) -> impl Future<Output = Result<Vec<CandidateRecord>>> + Send;
}

/// Oracle with canned answers keyed by announcement id.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    answers: HashMap<String, Vec<CandidateRecord>>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, announcement_id: impl Into<String>, records: Vec<CandidateRecord>) -> Self {
        self.answers.insert(announcement_id.into(), records);
        self
    }
}

impl ExtractionOracle for StaticOracle {
    fn extract(
        &self,
        announcement: &Announcement,
    ) -> impl Future<Output = Result<Vec<CandidateRecord>>> + Send {
        let answer = self.answers.get(&announcement.id).cloned().ok_or_else(|| {
            FrbSyncError::parse(format!("no answer for announcement {}", announcement.id))
        });
        async move { answer }
    }
}

/// Run the oracle over every announcement, in order.
///
/// An announcement the oracle fails on is logged and skipped. Candidates
/// without a `source_url` get the announcement's URL.
pub async fn extract_all<O: ExtractionOracle>(
    oracle: &O,
    announcements: &[Announcement],
) -> Vec<CandidateRecord> {
    let mut all = Vec::new();

    for announcement in announcements {
        match oracle.extract(announcement).await {
            Ok(records) => {
                info!(
                    source = %announcement.source,
                    id = %announcement.id,
                    found = records.len(),
                    "announcement parsed"
                );
                all.extend(records.into_iter().map(|mut r| {
                    r.source_url.get_or_insert_with(|| announcement.url.clone());
                    r
                }));
            }
            Err(e) => {
                warn!(id = %announcement.id, error = %e, "extraction failed, skipping announcement");
            }
        }
    }

    all
}

// ---------------------------------------------------------------------------
// Decoding oracle output
// ---------------------------------------------------------------------------

/// A candidate that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedCandidate {
    /// Position in the oracle's output array.
    pub index: usize,
    /// `TNSname` if one could be read, otherwise `#<index>`.
    pub identifier: String,
    pub reason: String,
}

impl MalformedCandidate {
    pub fn to_error(&self) -> FrbSyncError {
        FrbSyncError::malformed(self.reason.clone())
    }
}

/// One element of a decoded batch.
pub type DecodedCandidate = std::result::Result<CandidateRecord, MalformedCandidate>;

/// Decode oracle output into candidates, element by element.
///
/// Accepts a bare JSON array, an object holding the array under
/// `candidates` or `new_frbs`, and either wrapped in a markdown code fence.
/// A bad element becomes a [`MalformedCandidate`]; only unparseable JSON or
/// a wrong top-level shape fails the whole batch.
pub fn decode_candidates(text: &str, source_url: Option<&str>) -> Result<Vec<DecodedCandidate>> {
    let body = strip_code_fence(text);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FrbSyncError::parse(format!("oracle output is not JSON: {e}")))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map
            .remove("candidates")
            .or_else(|| map.remove("new_frbs"))
        {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(FrbSyncError::parse(
                    "expected a JSON array of candidates",
                ));
            }
        },
        _ => return Err(FrbSyncError::parse("expected a JSON array of candidates")),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_one(index, item, source_url))
        .collect())
}

fn decode_one(index: usize, item: serde_json::Value, source_url: Option<&str>) -> DecodedCandidate {
    let identifier = item
        .get("TNSname")
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("#{index}"));

    match serde_json::from_value::<CandidateRecord>(item) {
        Ok(mut record) => {
            if let Some(url) = source_url {
                record.source_url.get_or_insert_with(|| url.to_string());
            }
            Ok(record)
        }
        Err(e) => Err(MalformedCandidate {
            index,
            identifier,
            reason: e.to_string(),
        }),
    }
}

/// Return the contents of the first fenced block, or `text` trimmed.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip an info string such as `json`.
    let after = match after.find('\n') {
        Some(nl) if !after[..nl].contains('[') && !after[..nl].contains('{') => &after[nl + 1..],
        _ => after,
    };
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}
