//! Core domain types for the FRB catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FrbSyncError, Result};

/// Default angular-separation threshold below which two positions are the
/// same physical source.
pub const DEFAULT_MATCH_RADIUS_ARCSEC: f64 = 10.0;

// ---------------------------------------------------------------------------
// Canonical names
// ---------------------------------------------------------------------------

/// Collapse a burst name to its canonical catalog form.
///
/// `"FRB 20240501A"`, `" FRB20240501A "` and `"FRB\t20240501A"` all become
/// `"FRB20240501A"`. Case is preserved.
pub fn canonical_name(raw: &str) -> String {
    raw.split_whitespace().collect()
}

/// Every spelling of `raw` the catalog may have been written with: the name
/// as given, its canonical form, and the space-separated `FRB <date>` form.
///
/// Duplicates are removed; order is stable.
pub fn name_variants(raw: &str) -> Vec<String> {
    let canonical = canonical_name(raw);
    let mut variants = vec![raw.to_string(), canonical.clone()];

    if let Some(rest) = canonical.strip_prefix("FRB") {
        if !rest.is_empty() {
            variants.push(format!("FRB {rest}"));
        }
    }

    let mut seen = Vec::with_capacity(variants.len());
    for v in variants {
        if !v.is_empty() && !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How the host-galaxy redshift was measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedshiftType {
    #[serde(rename = "spec", alias = "spectroscopic")]
    Spectroscopic,
    #[serde(rename = "phot", alias = "photometric")]
    Photometric,
}

impl RedshiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spectroscopic => "spec",
            Self::Photometric => "phot",
        }
    }
}

/// Confidence of the burst-to-host association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostConfidence {
    #[serde(rename = "yes", alias = "secure")]
    Secure,
    #[serde(rename = "no", alias = "insecure")]
    Insecure,
}

impl HostConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secure => "yes",
            Self::Insecure => "no",
        }
    }
}

/// Whether a pipeline pass may write to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Resolve duplicates and report, never write.
    #[default]
    DryRun,
    /// Insert every non-duplicate candidate.
    Commit,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry-run",
            Self::Commit => "commit",
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = FrbSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dry-run" | "dry_run" | "dryrun" => Ok(Self::DryRun),
            "commit" => Ok(Self::Commit),
            other => Err(FrbSyncError::config(format!(
                "unknown mode '{other}': expected 'dry-run' or 'commit'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogValue
// ---------------------------------------------------------------------------

/// A single cell value destined for (or read from) the catalog table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CatalogValue {
    /// Convert a loosely-typed JSON value. `null`, objects and empty arrays
    /// yield `None`; string arrays become a comma-separated reference list.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Null | Value::Object(_) => None,
            Value::Bool(b) => Some(Self::Text(if *b { "yes" } else { "no" }.into())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Integer(i)),
                None => n.as_f64().map(Self::Real),
            },
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(Self::Text(parts.join(", ")))
                }
            }
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for CatalogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Field decoders for oracle output.
///
/// Optional fields never reject a candidate: a value that does not fit the
/// field's type decodes as `None`. Coordinates accept numbers and numeric
/// strings and reject anything else.
mod lenient {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub(super) fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => number(&value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a number, got {value}"))),
        }
    }

    pub(super) fn real<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number(&value).filter(|v| v.is_finite()))
    }

    pub(super) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Unit-like enums, matched case-insensitively.
    pub(super) fn variant<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let label = match Value::deserialize(deserializer)? {
            Value::String(s) => s.trim().to_ascii_lowercase(),
            Value::Bool(true) => "yes".into(),
            Value::Bool(false) => "no".into(),
            _ => return Ok(None),
        };
        Ok(serde_json::from_value(Value::String(label)).ok())
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord
// ---------------------------------------------------------------------------

/// A burst measurement produced by the extraction oracle.
///
/// Transient: lives for one pipeline pass. Every optional field defaults to
/// `None` when absent; fields the oracle emits beyond the typed ones are kept
/// in [`extra`](Self::extra) so the field-aliasing table can still see them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Catalog-style burst name, e.g. `"FRB 20240501A"`.
    #[serde(rename = "TNSname", alias = "tns_name", alias = "identifier")]
    pub tns_name: String,
    /// Internal nickname used by the detecting team.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::text"
    )]
    pub name: Option<String>,
    /// Right ascension, degrees.
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub ra: Option<f64>,
    /// Declination, degrees.
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub dec: Option<f64>,
    /// Extragalactic dispersion measure, pc cm^-3.
    #[serde(default, deserialize_with = "lenient::real")]
    pub dm_exgal: Option<f64>,
    #[serde(default, deserialize_with = "lenient::real")]
    pub redshift: Option<f64>,
    #[serde(default, deserialize_with = "lenient::variant")]
    pub redshift_type: Option<RedshiftType>,
    /// Detecting survey or telescope.
    #[serde(default, deserialize_with = "lenient::text")]
    pub survey: Option<String>,
    #[serde(default, deserialize_with = "lenient::variant")]
    pub secure_host: Option<HostConfidence>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub source_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::real"
    )]
    pub dm_opt: Option<f64>,
    /// Rotation measure, rad m^-2.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::real"
    )]
    pub rm: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::real"
    )]
    pub rm_err: Option<f64>,
    /// Epoch of detection (MJD).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::real"
    )]
    pub mjd: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CandidateRecord {
    /// Minimal candidate with a name and a position. Mostly useful in tests
    /// and for oracles that build records field by field.
    pub fn new(tns_name: impl Into<String>, ra: f64, dec: f64) -> Self {
        Self {
            tns_name: tns_name.into(),
            name: None,
            ra: Some(ra),
            dec: Some(dec),
            dm_exgal: None,
            redshift: None,
            redshift_type: None,
            survey: None,
            secure_host: None,
            source_url: None,
            dm_opt: None,
            rm: None,
            rm_err: None,
            mjd: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Canonical catalog name for this candidate.
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.tns_name)
    }

    /// Check the fields every catalog row needs and return the position.
    pub fn validate(&self) -> Result<(f64, f64)> {
        if canonical_name(&self.tns_name).is_empty() {
            return Err(FrbSyncError::malformed("empty burst name"));
        }
        let ra = finite(self.ra, "ra")?;
        let dec = finite(self.dec, "dec")?;
        Ok((ra, dec))
    }

    /// Look up a field by its oracle wire name.
    ///
    /// Typed fields are consulted first, then [`extra`](Self::extra).
    pub fn field(&self, key: &str) -> Option<CatalogValue> {
        let real = |v: Option<f64>| v.map(CatalogValue::Real);
        let text = |v: &Option<String>| v.clone().map(CatalogValue::Text);

        match key {
            "TNSname" => Some(CatalogValue::Text(self.tns_name.clone())),
            "name" => text(&self.name),
            "ra" => real(self.ra),
            "dec" => real(self.dec),
            "dm_exgal" => real(self.dm_exgal),
            "redshift" => real(self.redshift),
            "redshift_type" => self
                .redshift_type
                .map(|t| CatalogValue::Text(t.as_str().into())),
            "survey" => text(&self.survey),
            "secure_host" => self
                .secure_host
                .map(|h| CatalogValue::Text(h.as_str().into())),
            "source_url" => text(&self.source_url),
            "dm_opt" => real(self.dm_opt),
            "rm" => real(self.rm),
            "rm_err" => real(self.rm_err),
            "mjd" => real(self.mjd),
            other => self.extra.get(other).and_then(CatalogValue::from_json),
        }
    }
}

fn finite(value: Option<f64>, field: &str) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(FrbSyncError::malformed(format!("{field} is not finite"))),
        None => Err(FrbSyncError::malformed(format!("missing {field}"))),
    }
}

// ---------------------------------------------------------------------------
// CatalogRecord
// ---------------------------------------------------------------------------

/// A confirmed burst as persisted in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecord {
    /// Canonical, unique name.
    pub name: String,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
    pub dm: Option<f64>,
    pub redshift: Option<f64>,
    pub rm: Option<f64>,
    pub rm_err: Option<f64>,
    pub telescope: Option<String>,
    pub repeater: bool,
    pub references: Vec<String>,
    /// Columns present in the table but not modelled above.
    pub other: BTreeMap<String, CatalogValue>,
}

impl CatalogRecord {
    /// Build a record from `(column, value)` cells as read from the table.
    /// `None` values stand for SQL `NULL`.
    pub fn from_cells(cells: Vec<(String, Option<CatalogValue>)>) -> Result<Self> {
        let mut record = Self {
            name: String::new(),
            ra: None,
            dec: None,
            dm: None,
            redshift: None,
            rm: None,
            rm_err: None,
            telescope: None,
            repeater: false,
            references: Vec::new(),
            other: BTreeMap::new(),
        };

        for (column, value) in cells {
            let Some(value) = value else { continue };
            match column.as_str() {
                "Name" => record.name = value.to_string(),
                "ra" => record.ra = value.as_f64(),
                "dec" => record.dec = value.as_f64(),
                "DM" => record.dm = value.as_f64(),
                "z" => record.redshift = value.as_f64(),
                "RM" => record.rm = value.as_f64(),
                "RM_err" => record.rm_err = value.as_f64(),
                "telescope" => record.telescope = Some(value.to_string()),
                "repeater" => record.repeater = parse_flag(&value),
                "refs" => {
                    record.references = value
                        .to_string()
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                _ => {
                    record.other.insert(column, value);
                }
            }
        }

        if record.name.is_empty() {
            return Err(FrbSyncError::parse("catalog row has no Name"));
        }
        Ok(record)
    }
}

fn parse_flag(value: &CatalogValue) -> bool {
    match value {
        CatalogValue::Integer(i) => *i != 0,
        CatalogValue::Real(f) => *f != 0.0,
        CatalogValue::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_collapses_spacing() {
        assert_eq!(canonical_name("FRB 20240501A"), "FRB20240501A");
        assert_eq!(canonical_name("FRB20240501A"), "FRB20240501A");
        assert_eq!(canonical_name("  FRB\t20240501A "), "FRB20240501A");
        assert_eq!(canonical_name("frb 20240501a"), "frb20240501a");
    }

    #[test]
    fn name_variants_cover_both_spellings() {
        assert_eq!(
            name_variants("FRB 20240501A"),
            vec!["FRB 20240501A", "FRB20240501A"]
        );
        assert_eq!(
            name_variants("FRB20240501A"),
            vec!["FRB20240501A", "FRB 20240501A"]
        );
        assert_eq!(name_variants("fen"), vec!["fen"]);
    }

    #[test]
    fn candidate_deserializes_oracle_output() {
        let json = r#"{
            "TNSname": "FRB 20240101A",
            "ra": 180.5,
            "dec": -45.2,
            "dm_exgal": 350.5,
            "redshift": 0.25,
            "redshift_type": "spec",
            "survey": "ASKAP",
            "secure_host": "yes",
            "rm": 125.5,
            "rm_err": null,
            "repeater": true
        }"#;
        let c: CandidateRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(c.tns_name, "FRB 20240101A");
        assert_eq!(c.redshift_type, Some(RedshiftType::Spectroscopic));
        assert_eq!(c.secure_host, Some(HostConfidence::Secure));
        assert_eq!(c.rm_err, None);
        assert_eq!(c.mjd, None);
        assert_eq!(c.field("repeater"), Some(CatalogValue::Text("yes".into())));
        assert_eq!(c.field("survey"), Some(CatalogValue::Text("ASKAP".into())));
        assert_eq!(c.field("unknown_field"), None);
    }

    #[test]
    fn unexpected_optional_values_decode_as_none() {
        let json = r#"{
            "TNSname": "FRB 20240101A",
            "ra": "30.5",
            "dec": " -7.25 ",
            "rm": "N/A",
            "rm_err": {"value": 3},
            "dm_exgal": "412.1",
            "redshift_type": "Spec",
            "secure_host": "probable",
            "survey": 42
        }"#;
        let c: CandidateRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(c.ra, Some(30.5));
        assert_eq!(c.dec, Some(-7.25));
        assert_eq!(c.rm, None);
        assert_eq!(c.rm_err, None);
        assert_eq!(c.dm_exgal, Some(412.1));
        assert_eq!(c.redshift_type, Some(RedshiftType::Spectroscopic));
        assert_eq!(c.secure_host, None);
        assert_eq!(c.survey.as_deref(), Some("42"));
        assert!(!c.extra.contains_key("rm"));
    }

    #[test]
    fn host_confidence_accepts_booleans() {
        let json = r#"{"TNSname": "FRB 20240101A", "secure_host": false}"#;
        let c: CandidateRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(c.secure_host, Some(HostConfidence::Insecure));
        assert_eq!(c.ra, None);
    }

    #[test]
    fn candidate_rejects_non_numeric_coordinate() {
        let json = r#"{"TNSname": "FRB 20240101A", "ra": "12h30m", "dec": 1.0}"#;
        assert!(serde_json::from_str::<CandidateRecord>(json).is_err());
    }

    #[test]
    fn validate_requires_name_and_position() {
        let ok = CandidateRecord::new("FRB 20240501A", 188.736, 45.209);
        assert_eq!(ok.validate().expect("valid"), (188.736, 45.209));

        let mut missing_dec = ok.clone();
        missing_dec.dec = None;
        let err = missing_dec.validate().unwrap_err();
        assert!(err.to_string().contains("missing dec"));

        let blank = CandidateRecord::new("   ", 1.0, 2.0);
        assert!(blank.validate().is_err());

        let mut nan = ok;
        nan.ra = Some(f64::NAN);
        assert!(nan.validate().unwrap_err().to_string().contains("ra"));
    }

    #[test]
    fn catalog_value_from_json() {
        use serde_json::json;
        assert_eq!(CatalogValue::from_json(&json!(null)), None);
        assert_eq!(
            CatalogValue::from_json(&json!(3)),
            Some(CatalogValue::Integer(3))
        );
        assert_eq!(
            CatalogValue::from_json(&json!(["ATel 16000", "arXiv:2405.0001"])),
            Some(CatalogValue::Text("ATel 16000, arXiv:2405.0001".into()))
        );
        assert_eq!(CatalogValue::from_json(&json!([])), None);
    }

    #[test]
    fn catalog_record_from_cells() {
        let record = CatalogRecord::from_cells(vec![
            ("Name".into(), Some(CatalogValue::Text("FRB20121102A".into()))),
            ("ra".into(), Some(CatalogValue::Real(82.99))),
            ("dec".into(), Some(CatalogValue::Integer(33))),
            ("z".into(), None),
            ("repeater".into(), Some(CatalogValue::Text("yes".into()))),
            ("refs".into(), Some(CatalogValue::Text("a, b,".into()))),
            ("z_type".into(), Some(CatalogValue::Text("spec".into()))),
        ])
        .expect("record");

        assert_eq!(record.name, "FRB20121102A");
        assert_eq!(record.dec, Some(33.0));
        assert_eq!(record.redshift, None);
        assert!(record.repeater);
        assert_eq!(record.references, vec!["a", "b"]);
        assert!(record.other.contains_key("z_type"));
    }

    #[test]
    fn merge_mode_parsing() {
        assert_eq!("commit".parse::<MergeMode>().unwrap(), MergeMode::Commit);
        assert_eq!("dry-run".parse::<MergeMode>().unwrap(), MergeMode::DryRun);
        assert!("update".parse::<MergeMode>().is_err());
        assert_eq!(MergeMode::default(), MergeMode::DryRun);
    }
}
