//! Candidate-field to catalog-column aliasing.
//!
//! [`COLUMN_ALIASES`] is the single source of truth for how an oracle record
//! becomes a catalog row. For each column the listed candidate fields are
//! tried in order and the first non-null value wins; if none is present the
//! fallback (if any) is used.

use frbsync_shared::{CandidateRecord, CatalogValue};
use frbsync_storage::CatalogRow;

/// One catalog column and the candidate fields that can fill it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAlias {
    pub column: &'static str,
    pub fields: &'static [&'static str],
    pub fallback: Option<&'static str>,
}

const fn alias(column: &'static str, fields: &'static [&'static str]) -> ColumnAlias {
    ColumnAlias {
        column,
        fields,
        fallback: None,
    }
}

const fn alias_or(
    column: &'static str,
    fields: &'static [&'static str],
    fallback: &'static str,
) -> ColumnAlias {
    ColumnAlias {
        column,
        fields,
        fallback: Some(fallback),
    }
}

/// Column the canonical burst name is written to.
pub const NAME_COLUMN: &str = "Name";

/// Ordered aliasing table. `Name` is not listed: it is always the canonical
/// form of `TNSname`.
pub const COLUMN_ALIASES: &[ColumnAlias] = &[
    alias("ra", &["ra"]),
    alias("dec", &["dec"]),
    alias("DM", &["dm", "dm_exgal", "DM"]),
    alias("z", &["z", "redshift"]),
    alias("z_type", &["redshift_type"]),
    alias("RM", &["rm", "RM"]),
    alias("RM_err", &["rm_err", "RM_err"]),
    alias_or("telescope", &["telescope", "survey"], "unknown"),
    alias_or("repeater", &["repeater"], "no"),
    alias_or("refs", &["refs", "reference", "source_url"], ""),
    alias("mjd", &["mjd"]),
];

/// Resolve one column's value for `candidate`.
pub fn resolve_column(candidate: &CandidateRecord, alias: &ColumnAlias) -> Option<CatalogValue> {
    alias
        .fields
        .iter()
        .find_map(|field| candidate.field(field))
        .or_else(|| alias.fallback.map(|f| CatalogValue::Text(f.into())))
}

/// Build the full row for `candidate`, before filtering to the store's
/// declared columns. Columns with no value and no fallback are omitted.
pub fn build_row(candidate: &CandidateRecord) -> CatalogRow {
    let mut row = CatalogRow::new();
    row.set(NAME_COLUMN, CatalogValue::Text(candidate.canonical_name()));
    for alias in COLUMN_ALIASES {
        if let Some(value) = resolve_column(candidate, alias) {
            row.set(alias.column, value);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate() -> CandidateRecord {
        let mut c = CandidateRecord::new("FRB 20240501A", 188.736, 45.209);
        c.dm_exgal = Some(425.3);
        c.redshift = Some(0.312);
        c.survey = Some("DSA-110".into());
        c
    }

    #[test]
    fn every_column_listed_once() {
        let mut seen: Vec<&str> = vec![NAME_COLUMN];
        for alias in COLUMN_ALIASES {
            assert!(!seen.contains(&alias.column), "{} listed twice", alias.column);
            assert!(!alias.fields.is_empty());
            seen.push(alias.column);
        }
    }

    #[test]
    fn name_is_canonicalized() {
        let row = build_row(&candidate());
        assert_eq!(
            row.get("Name"),
            Some(&CatalogValue::Text("FRB20240501A".into()))
        );
    }

    #[test]
    fn extragalactic_dm_fills_dm_column() {
        let row = build_row(&candidate());
        assert_eq!(row.get("DM"), Some(&CatalogValue::Real(425.3)));
        assert_eq!(row.get("z"), Some(&CatalogValue::Real(0.312)));
        assert_eq!(row.get("telescope"), Some(&CatalogValue::Text("DSA-110".into())));
    }

    #[test]
    fn first_non_null_alias_wins() {
        let mut c = candidate();
        c.extra.insert("dm".into(), json!(null));
        c.extra.insert("DM".into(), json!(999.0));
        // `dm` is null, so `dm_exgal` is next in line.
        let dm = COLUMN_ALIASES.iter().find(|a| a.column == "DM").unwrap();
        assert_eq!(resolve_column(&c, dm), Some(CatalogValue::Real(425.3)));

        c.extra.insert("dm".into(), json!(401.0));
        assert_eq!(resolve_column(&c, dm), Some(CatalogValue::Real(401.0)));
    }

    #[test]
    fn fallbacks_apply_when_absent() {
        let c = CandidateRecord::new("FRB 20240501A", 1.0, 2.0);
        let row = build_row(&c);
        assert_eq!(row.get("telescope"), Some(&CatalogValue::Text("unknown".into())));
        assert_eq!(row.get("repeater"), Some(&CatalogValue::Text("no".into())));
        assert_eq!(row.get("refs"), Some(&CatalogValue::Text(String::new())));
        assert!(row.get("DM").is_none());
        assert!(row.get("RM").is_none());
    }

    #[test]
    fn source_url_becomes_reference() {
        let mut c = candidate();
        c.source_url = Some("https://www.astronomerstelegram.org/?read=16600".into());
        let row = build_row(&c);
        assert_eq!(
            row.get("refs"),
            Some(&CatalogValue::Text(
                "https://www.astronomerstelegram.org/?read=16600".into()
            ))
        );
    }

    #[test]
    fn extra_fields_are_visible() {
        let mut c = candidate();
        c.extra.insert("repeater".into(), json!("yes"));
        c.extra.insert("telescope".into(), json!("CHIME"));
        let row = build_row(&c);
        assert_eq!(row.get("repeater"), Some(&CatalogValue::Text("yes".into())));
        assert_eq!(row.get("telescope"), Some(&CatalogValue::Text("CHIME".into())));
    }
}
