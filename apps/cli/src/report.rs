//! Markdown report of the bursts a run accepted, for PR review.

use std::fmt::Write;
use std::path::Path;

use frbsync_core::pipeline::PipelineSummary;

fn num(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}"))
        .unwrap_or_else(|| "N/A".into())
}

/// Render the accepted subset of `summary` as a markdown document.
pub(crate) fn render_markdown(summary: &PipelineSummary, catalog: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# FRB Catalog Update Report\n");
    let _ = writeln!(
        out,
        "**Generated:** {}",
        summary.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "**Catalog:** {}", catalog.display());
    let _ = writeln!(out, "**Mode:** {}\n", summary.mode);
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(
        out,
        "Found **{}** new FRB(s) out of {} candidate(s).\n",
        summary.accepted.len(),
        summary.outcomes.len()
    );

    if summary.accepted.is_empty() {
        out.push_str("_No new FRBs found._\n");
        return out;
    }

    out.push_str("## New FRBs\n\n");
    for report in &summary.accepted {
        let _ = writeln!(out, "### {}\n", report.identifier);
        let Some(c) = &report.candidate else { continue };

        let redshift_type = c.redshift_type.map(|t| t.as_str()).unwrap_or("N/A");
        let survey = c.survey.as_deref().unwrap_or("N/A");
        let source = c.source_url.as_deref().unwrap_or("N/A");
        let link = c.source_url.as_deref().unwrap_or("#");

        out.push_str("| Field | Value |\n|-------|-------|\n");
        let _ = writeln!(out, "| RA | {} deg |", num(c.ra, 6));
        let _ = writeln!(out, "| Dec | {} deg |", num(c.dec, 6));
        let _ = writeln!(out, "| DM | {} pc/cm³ |", num(c.dm_exgal, 1));
        let _ = writeln!(out, "| Redshift | {} ({redshift_type}) |", num(c.redshift, 4));
        let _ = writeln!(out, "| Survey | {survey} |");
        let _ = writeln!(out, "| Source | [{source}]({link}) |\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use frbsync_core::pipeline::CandidateReport;
    use frbsync_shared::{CandidateRecord, MergeMode, RedshiftType};

    fn summary(accepted: Vec<CandidateReport>) -> PipelineSummary {
        PipelineSummary {
            mode: MergeMode::DryRun,
            generated_at: "2024-05-15T12:00:00Z".parse().unwrap(),
            outcomes: accepted.clone(),
            accepted,
            duplicates: 0,
            errors: 0,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn empty_report() {
        let md = render_markdown(&summary(vec![]), Path::new("frbs.db"));
        assert!(md.contains("**Generated:** 2024-05-15 12:00 UTC"));
        assert!(md.contains("_No new FRBs found._"));
    }

    #[test]
    fn accepted_burst_table() {
        let mut c = CandidateRecord::new("FRB 20240501A", 188.736, 45.209);
        c.redshift = Some(0.312);
        c.redshift_type = Some(RedshiftType::Spectroscopic);
        c.survey = Some("DSA-110".into());
        let report = CandidateReport {
            identifier: c.tns_name.clone(),
            candidate: Some(c),
            accepted: true,
            message: "would add FRB20240501A".into(),
        };

        let md = render_markdown(&summary(vec![report]), Path::new("frbs.db"));
        assert!(md.contains("### FRB 20240501A"));
        assert!(md.contains("| RA | 188.736000 deg |"));
        assert!(md.contains("| Redshift | 0.3120 (spec) |"));
        assert!(md.contains("| DM | N/A pc/cm³ |"));
        assert!(md.contains("| Source | [N/A](#) |"));
    }
}
